use placeshare_core::db::migrations::latest_version;
use placeshare_core::db::open_db_in_memory;
use placeshare_core::{
    CreatePlaceAtAddressRequest, CreatePlaceRequest, GeoPoint, GeocodeError, Geocoder,
    PlaceRepoError, PlaceService, PlaceServiceError, PlaceValidationError, SqlitePlaceRepository,
    SqliteUserRepository, User, UserId, UserRepository,
};
use rusqlite::Connection;
use uuid::Uuid;

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn seed_user(conn: &Connection, email: &str) -> User {
    let users = SqliteUserRepository::try_new(conn).unwrap();
    let user = User::new("Test User", email, None, "secret-pass");
    users.create_user(&user).unwrap();
    user
}

fn service(
    conn: &Connection,
) -> PlaceService<SqlitePlaceRepository<'_>, SqliteUserRepository<'_>> {
    PlaceService::new(
        SqlitePlaceRepository::try_new(conn).unwrap(),
        SqliteUserRepository::try_new(conn).unwrap(),
    )
}

fn empire_state_request(creator_uuid: UserId) -> CreatePlaceRequest {
    CreatePlaceRequest {
        title: "Empire State Building".to_string(),
        description: "One of the most famous sky scrapers in the world.".to_string(),
        address: "350 5th Ave, New York, NY 10118".to_string(),
        location: GeoPoint {
            lat: 40.7484,
            lng: -73.9857,
        },
        image: Some("https://example.com/empire-state.jpg".to_string()),
        creator_uuid,
    }
}

#[test]
fn create_and_get_roundtrip() {
    let conn = setup();
    let user = seed_user(&conn, "creator@example.com");
    let service = service(&conn);

    let created = service.create_place(&empire_state_request(user.uuid)).unwrap();
    assert_eq!(created.title, "Empire State Building");
    assert_eq!(created.creator, user.uuid);

    let loaded = service.get_place(created.uuid).unwrap();
    assert_eq!(loaded, created);

    let owned = service.places_by_user(user.uuid).unwrap();
    assert_eq!(owned.len(), 1);
    assert_eq!(owned[0].uuid, created.uuid);
}

#[test]
fn create_fails_for_unknown_creator_and_leaves_no_place_behind() {
    let conn = setup();
    seed_user(&conn, "creator@example.com");
    let service = service(&conn);

    let unknown = Uuid::new_v4();
    let err = service.create_place(&empire_state_request(unknown)).unwrap_err();
    assert!(matches!(err, PlaceServiceError::CreatorNotFound(id) if id == unknown));

    let place_count: i64 = conn
        .query_row("SELECT COUNT(*) FROM places;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(place_count, 0);
}

#[test]
fn create_rejects_invalid_input() {
    let conn = setup();
    let user = seed_user(&conn, "creator@example.com");
    let service = service(&conn);

    let mut blank_title = empire_state_request(user.uuid);
    blank_title.title = "  ".to_string();
    assert!(matches!(
        service.create_place(&blank_title).unwrap_err(),
        PlaceServiceError::InvalidInput(PlaceValidationError::BlankTitle)
    ));

    let mut short_description = empire_state_request(user.uuid);
    short_description.description = "tiny".to_string();
    assert!(matches!(
        service.create_place(&short_description).unwrap_err(),
        PlaceServiceError::InvalidInput(PlaceValidationError::DescriptionTooShort { .. })
    ));

    let mut bad_latitude = empire_state_request(user.uuid);
    bad_latitude.location.lat = 120.0;
    assert!(matches!(
        service.create_place(&bad_latitude).unwrap_err(),
        PlaceServiceError::InvalidInput(PlaceValidationError::CoordinateOutOfRange { .. })
    ));
}

#[test]
fn update_changes_content_and_keeps_identity_fields() {
    let conn = setup();
    let user = seed_user(&conn, "creator@example.com");
    let service = service(&conn);

    let created = service.create_place(&empire_state_request(user.uuid)).unwrap();
    let updated = service
        .update_place(created.uuid, "New Title", "New description ok")
        .unwrap();

    assert_eq!(updated.title, "New Title");
    assert_eq!(updated.description, "New description ok");
    assert_eq!(updated.uuid, created.uuid);
    assert_eq!(updated.creator, created.creator);
    assert_eq!(updated.location, created.location);
    assert_eq!(updated.address, created.address);
}

#[test]
fn update_missing_place_returns_not_found() {
    let conn = setup();
    seed_user(&conn, "creator@example.com");
    let service = service(&conn);

    let missing = Uuid::new_v4();
    let err = service
        .update_place(missing, "New Title", "New description ok")
        .unwrap_err();
    assert!(matches!(err, PlaceServiceError::PlaceNotFound(id) if id == missing));
}

#[test]
fn delete_returns_previous_state_and_removes_place() {
    let conn = setup();
    let user = seed_user(&conn, "creator@example.com");
    let service = service(&conn);

    let created = service.create_place(&empire_state_request(user.uuid)).unwrap();
    let deleted = service.delete_place(created.uuid).unwrap();
    assert_eq!(deleted, created);

    let err = service.get_place(created.uuid).unwrap_err();
    assert!(matches!(err, PlaceServiceError::PlaceNotFound(id) if id == created.uuid));

    let owned = service.places_by_user(user.uuid).unwrap();
    assert!(owned.is_empty());
}

#[test]
fn lookup_for_unknown_user_fails_but_empty_list_is_ok() {
    let conn = setup();
    let user = seed_user(&conn, "creator@example.com");
    let service = service(&conn);

    let unknown = Uuid::new_v4();
    let err = service.places_by_user(unknown).unwrap_err();
    assert!(matches!(err, PlaceServiceError::CreatorNotFound(id) if id == unknown));

    let owned = service.places_by_user(user.uuid).unwrap();
    assert!(owned.is_empty());
}

struct FixedGeocoder(GeoPoint);

impl Geocoder for FixedGeocoder {
    fn resolve(&self, _address: &str) -> Result<GeoPoint, GeocodeError> {
        Ok(self.0)
    }
}

struct FailingGeocoder;

impl Geocoder for FailingGeocoder {
    fn resolve(&self, address: &str) -> Result<GeoPoint, GeocodeError> {
        Err(GeocodeError::AddressNotFound(address.to_string()))
    }
}

#[test]
fn create_at_address_resolves_coordinates_through_geocoder() {
    let conn = setup();
    let user = seed_user(&conn, "creator@example.com");
    let service = service(&conn);

    let geocoder = FixedGeocoder(GeoPoint {
        lat: 52.5163,
        lng: 13.3777,
    });
    let request = CreatePlaceAtAddressRequest {
        title: "Brandenburg Gate".to_string(),
        description: "Neoclassical monument in Berlin.".to_string(),
        address: "Pariser Platz, 10117 Berlin".to_string(),
        image: None,
        creator_uuid: user.uuid,
    };

    let created = service.create_place_at_address(&geocoder, &request).unwrap();
    assert_eq!(created.location.lat, 52.5163);
    assert_eq!(created.location.lng, 13.3777);
}

#[test]
fn geocoder_failure_creates_nothing() {
    let conn = setup();
    let user = seed_user(&conn, "creator@example.com");
    let service = service(&conn);

    let request = CreatePlaceAtAddressRequest {
        title: "Nowhere".to_string(),
        description: "An address nobody can resolve.".to_string(),
        address: "???".to_string(),
        image: None,
        creator_uuid: user.uuid,
    };

    let err = service
        .create_place_at_address(&FailingGeocoder, &request)
        .unwrap_err();
    assert!(matches!(err, PlaceServiceError::Geocode(_)));

    let place_count: i64 = conn
        .query_row("SELECT COUNT(*) FROM places;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(place_count, 0);
}

#[test]
fn repository_rejects_uninitialized_connection() {
    let conn = Connection::open_in_memory().unwrap();

    let result = SqlitePlaceRepository::try_new(&conn);
    match result {
        Err(PlaceRepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert!(expected_version > 0),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn repository_rejects_connection_without_required_places_table() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqlitePlaceRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(PlaceRepoError::MissingRequiredTable("places"))
    ));
}

#[test]
fn repository_rejects_connection_missing_required_places_column() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE places (
            uuid TEXT PRIMARY KEY NOT NULL,
            title TEXT NOT NULL,
            creator_uuid TEXT NOT NULL
        );",
    )
    .unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqlitePlaceRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(PlaceRepoError::MissingRequiredColumn {
            table: "places",
            column: "description"
        })
    ));
}
