use placeshare_core::db::open_db_in_memory;
use placeshare_core::{
    SignUpRequest, SqliteUserRepository, User, UserRepoError, UserRepository, UserService,
    UserServiceError, UserValidationError,
};
use rusqlite::Connection;
use uuid::Uuid;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn service(conn: &Connection) -> UserService<SqliteUserRepository<'_>> {
    UserService::new(SqliteUserRepository::try_new(conn).unwrap())
}

fn max_request() -> SignUpRequest {
    SignUpRequest {
        name: "Max Schwarz".to_string(),
        email: "max@example.com".to_string(),
        image: None,
        password: "secret-pass".to_string(),
    }
}

#[test]
fn sign_up_creates_account_with_empty_place_list() {
    let conn = setup();
    let service = service(&conn);

    let record = service.sign_up(&max_request()).unwrap();
    assert_eq!(record.name, "Max Schwarz");
    assert_eq!(record.email, "max@example.com");
    assert!(record.places.is_empty());

    let loaded = service.get_user(record.uuid).unwrap();
    assert_eq!(loaded, record);
}

#[test]
fn sign_up_normalizes_email() {
    let conn = setup();
    let service = service(&conn);

    let mut request = max_request();
    request.email = "  Max@Example.COM ".to_string();
    let record = service.sign_up(&request).unwrap();
    assert_eq!(record.email, "max@example.com");
}

#[test]
fn sign_up_rejects_duplicate_email_regardless_of_case() {
    let conn = setup();
    let service = service(&conn);

    service.sign_up(&max_request()).unwrap();

    let mut duplicate = max_request();
    duplicate.email = "MAX@example.com".to_string();
    let err = service.sign_up(&duplicate).unwrap_err();
    assert!(matches!(err, UserServiceError::EmailTaken(email) if email == "max@example.com"));
}

#[test]
fn repository_maps_unique_violation_to_email_taken() {
    let conn = setup();
    let users = SqliteUserRepository::try_new(&conn).unwrap();

    let first = User::new("First", "same@example.com", None, "secret-pass");
    let second = User::new("Second", "same@example.com", None, "other-pass");
    users.create_user(&first).unwrap();

    let err = users.create_user(&second).unwrap_err();
    assert!(matches!(err, UserRepoError::EmailTaken(email) if email == "same@example.com"));
}

#[test]
fn sign_up_rejects_invalid_input() {
    let conn = setup();
    let service = service(&conn);

    let mut blank_name = max_request();
    blank_name.name = "   ".to_string();
    assert!(matches!(
        service.sign_up(&blank_name).unwrap_err(),
        UserServiceError::InvalidInput(UserValidationError::BlankName)
    ));

    let mut bad_email = max_request();
    bad_email.email = "not-an-email".to_string();
    assert!(matches!(
        service.sign_up(&bad_email).unwrap_err(),
        UserServiceError::InvalidInput(UserValidationError::InvalidEmail)
    ));

    let mut short_password = max_request();
    short_password.password = "tiny".to_string();
    assert!(matches!(
        service.sign_up(&short_password).unwrap_err(),
        UserServiceError::InvalidInput(UserValidationError::PasswordTooShort { .. })
    ));
}

#[test]
fn log_in_accepts_matching_credentials() {
    let conn = setup();
    let service = service(&conn);

    let record = service.sign_up(&max_request()).unwrap();
    let user_uuid = service.log_in("max@example.com", "secret-pass").unwrap();
    assert_eq!(user_uuid, record.uuid);

    // The lookup email is normalized like the stored one.
    let user_uuid = service.log_in(" Max@Example.com ", "secret-pass").unwrap();
    assert_eq!(user_uuid, record.uuid);
}

#[test]
fn log_in_rejects_wrong_password_and_unknown_email_alike() {
    let conn = setup();
    let service = service(&conn);
    service.sign_up(&max_request()).unwrap();

    let err = service.log_in("max@example.com", "wrong-pass").unwrap_err();
    assert!(matches!(err, UserServiceError::InvalidCredentials));

    let err = service.log_in("nobody@example.com", "secret-pass").unwrap_err();
    assert!(matches!(err, UserServiceError::InvalidCredentials));
}

#[test]
fn get_user_returns_not_found_for_unknown_id() {
    let conn = setup();
    let service = service(&conn);

    let missing = Uuid::new_v4();
    let err = service.get_user(missing).unwrap_err();
    assert!(matches!(err, UserServiceError::UserNotFound(id) if id == missing));
}

#[test]
fn list_users_returns_all_accounts() {
    let conn = setup();
    let service = service(&conn);

    let first = service.sign_up(&max_request()).unwrap();
    let mut second_request = max_request();
    second_request.name = "Julie Jones".to_string();
    second_request.email = "julie@example.com".to_string();
    let second = service.sign_up(&second_request).unwrap();

    let listed = service.list_users().unwrap();
    assert_eq!(listed.len(), 2);
    let ids: Vec<_> = listed.iter().map(|record| record.uuid).collect();
    assert!(ids.contains(&first.uuid));
    assert!(ids.contains(&second.uuid));
}

#[test]
fn repository_rejects_uninitialized_connection() {
    let conn = Connection::open_in_memory().unwrap();

    let result = SqliteUserRepository::try_new(&conn);
    match result {
        Err(UserRepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert!(expected_version > 0),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn serialized_users_never_carry_the_password() {
    let conn = setup();
    let service = service(&conn);
    let record = service.sign_up(&max_request()).unwrap();

    let record_json = serde_json::to_value(&record).unwrap();
    assert!(record_json.get("password").is_none());
    assert_eq!(record_json["email"], "max@example.com");

    let user = User::new("Max Schwarz", "max@example.com", None, "secret-pass");
    let user_json = serde_json::to_value(&user).unwrap();
    assert!(user_json.get("password").is_none());
    assert_eq!(user_json["name"], "Max Schwarz");
}
