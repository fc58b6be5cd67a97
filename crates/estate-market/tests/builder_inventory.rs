//! Integration specifications for the builder's inventory: the single
//! residential complex per builder, auto-numbered subdivisions, flats,
//! referential deletion protection, and gallery editing.

mod common {
    use std::sync::Arc;

    use estate_market::marketplace::announcements::AnnouncementService;
    use estate_market::marketplace::catalog::domain::{
        ComplexPayload, CorpsId, FlatCondition, FlatPayload, FloorId, HouseClass, HouseStatus,
        SectionId, TerritoryType,
    };
    use estate_market::marketplace::catalog::CatalogService;
    use estate_market::marketplace::store::MemoryStore;
    use estate_market::marketplace::users::{Principal, Role, UserDirectory};

    pub(super) struct Fixture {
        pub store: Arc<MemoryStore>,
        pub announcements: Arc<AnnouncementService<MemoryStore, MemoryStore>>,
        pub catalog: Arc<CatalogService<MemoryStore, MemoryStore>>,
    }

    pub(super) fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let directory: Arc<dyn UserDirectory> = store.clone();
        Fixture {
            announcements: Arc::new(AnnouncementService::new(
                store.clone(),
                store.clone(),
                directory.clone(),
            )),
            catalog: Arc::new(CatalogService::new(store.clone(), store.clone(), directory)),
            store,
        }
    }

    pub(super) fn add(fixture: &Fixture, name: &str, role: Role) -> (Principal, String) {
        let email = format!("{}@estate.test", name.to_lowercase());
        let (user, token) = fixture.store.add_user(name, "Tester", &email, role);
        (
            Principal {
                user_id: user.id,
                role: user.role,
            },
            token,
        )
    }

    pub(super) fn complex_payload(name: &str) -> ComplexPayload {
        ComplexPayload {
            name: name.to_string(),
            address: "Quay 12".into(),
            description: "Waterfront".into(),
            house_status: HouseStatus::Flats,
            house_class: HouseClass::Common,
            territory_type: TerritoryType::Closed,
            price_for_meter: 1350.0,
            min_price: 42_000,
            main_photo: "main.jpg".into(),
            gallery_photos: Vec::new(),
        }
    }

    pub(super) fn flat_payload(corps: CorpsId, section: SectionId, floor: FloorId) -> FlatPayload {
        FlatPayload {
            corps,
            section,
            floor,
            district: "harbor".into(),
            micro_district: "east".into(),
            room_amount: 2,
            scheme: "scheme.png".into(),
            square: 58,
            price: 61_000,
            condition: FlatCondition::LivingCondition,
            gallery_photos: Vec::new(),
        }
    }

    /// Builder, their complex, and one flat on Corps 1 / Section 1 / Floor 1.
    pub(super) fn seeded_inventory(
        fixture: &Fixture,
    ) -> (
        Principal,
        estate_market::marketplace::catalog::domain::ComplexId,
        estate_market::marketplace::catalog::domain::FlatId,
    ) {
        let (builder, _) = add(fixture, "Bea", Role::Builder);
        let complex = fixture
            .catalog
            .create_complex(&builder, complex_payload("Riverside"))
            .expect("complex registers");
        let corps = fixture.catalog.create_corps(&builder).expect("corps");
        let section = fixture.catalog.create_section(&builder).expect("section");
        let floor = fixture.catalog.create_floor(&builder).expect("floor");
        let flat = fixture
            .catalog
            .create_flat(
                &builder,
                flat_payload(CorpsId(corps.id), SectionId(section.id), FloorId(floor.id)),
            )
            .expect("flat");
        (builder, complex.id, flat.id)
    }
}

use common::*;
use estate_market::marketplace::announcements::{
    ApprovalPayload, CommunicationMethod, HeatingType, HouseCondition, PaymentOption, Planning,
    Purpose, SubmissionPayload,
};
use estate_market::marketplace::catalog::domain::{ComplexUpdate, CorpsId, FloorId, SectionId};
use estate_market::marketplace::catalog::gallery::PhotoPayload;
use estate_market::marketplace::catalog::{CatalogError, CatalogServiceError};
use estate_market::marketplace::users::Role;

#[test]
fn a_builder_holds_exactly_one_complex() {
    let fixture = fixture();
    let (builder, _) = add(&fixture, "Bea", Role::Builder);
    fixture
        .catalog
        .create_complex(&builder, complex_payload("Riverside"))
        .expect("first complex registers");

    let error = fixture
        .catalog
        .create_complex(&builder, complex_payload("Hillside"))
        .expect_err("second complex is rejected");
    assert!(matches!(
        error,
        CatalogServiceError::Validation { field: "owner", .. }
    ));
}

#[test]
fn regular_users_cannot_own_inventory() {
    let fixture = fixture();
    let (user, _) = add(&fixture, "Ann", Role::User);
    let error = fixture
        .catalog
        .create_complex(&user, complex_payload("Riverside"))
        .expect_err("non-builders are refused");
    assert!(matches!(error, CatalogServiceError::Forbidden));
}

#[test]
fn subdivisions_are_numbered_in_creation_order() {
    let fixture = fixture();
    let (builder, _) = add(&fixture, "Bea", Role::Builder);
    fixture
        .catalog
        .create_complex(&builder, complex_payload("Riverside"))
        .expect("complex registers");

    let first = fixture.catalog.create_corps(&builder).expect("corps");
    let second = fixture.catalog.create_corps(&builder).expect("corps");
    assert_eq!(first.name, "Corps 1");
    assert_eq!(second.name, "Corps 2");

    let section = fixture.catalog.create_section(&builder).expect("section");
    assert_eq!(section.name, "Section 1");
    let floor = fixture.catalog.create_floor(&builder).expect("floor");
    assert_eq!(floor.name, "Floor 1");

    let listed = fixture.catalog.my_corps(&builder).expect("corps list");
    assert_eq!(listed.len(), 2);
}

#[test]
fn flats_only_reference_the_builders_own_subdivisions() {
    let fixture = fixture();
    let (builder, _, _) = seeded_inventory(&fixture);

    let (other, _) = add(&fixture, "Ona", Role::Builder);
    fixture
        .catalog
        .create_complex(&other, complex_payload("Hillside"))
        .expect("second complex");
    let foreign_corps = fixture.catalog.create_corps(&other).expect("corps");
    let section = fixture.catalog.my_sections(&builder).expect("sections")[0].id;
    let floor = fixture.catalog.my_floors(&builder).expect("floors")[0].id;

    let error = fixture
        .catalog
        .create_flat(
            &builder,
            flat_payload(
                CorpsId(foreign_corps.id),
                SectionId(section),
                FloorId(floor),
            ),
        )
        .expect_err("foreign corps is rejected");
    assert!(matches!(
        error,
        CatalogServiceError::Validation { field: "corps", .. }
    ));
}

#[test]
fn flat_room_amount_stays_within_bounds() {
    let fixture = fixture();
    let (builder, _) = add(&fixture, "Bea", Role::Builder);
    fixture
        .catalog
        .create_complex(&builder, complex_payload("Riverside"))
        .expect("complex registers");
    let corps = fixture.catalog.create_corps(&builder).expect("corps");
    let section = fixture.catalog.create_section(&builder).expect("section");
    let floor = fixture.catalog.create_floor(&builder).expect("floor");

    let mut payload = flat_payload(CorpsId(corps.id), SectionId(section.id), FloorId(floor.id));
    payload.room_amount = 42;
    let error = fixture
        .catalog
        .create_flat(&builder, payload)
        .expect_err("forty-two rooms is out of range");
    assert!(matches!(
        error,
        CatalogServiceError::Validation { field: "room_amount", .. }
    ));

    let flat = fixture
        .catalog
        .create_flat(
            &builder,
            flat_payload(CorpsId(corps.id), SectionId(section.id), FloorId(floor.id)),
        )
        .expect("flat registers");
    let error = fixture
        .catalog
        .update_my_flat(
            &builder,
            flat.id,
            estate_market::marketplace::catalog::domain::FlatUpdate {
                room_amount: Some(0),
                ..Default::default()
            },
        )
        .expect_err("zero rooms is out of range");
    assert!(matches!(
        error,
        CatalogServiceError::Validation { field: "room_amount", .. }
    ));
}

#[test]
fn complexes_with_flats_resist_deletion() {
    let fixture = fixture();
    let (builder, _, flat) = seeded_inventory(&fixture);

    let error = fixture
        .catalog
        .delete_my_complex(&builder)
        .expect_err("flats protect the complex");
    assert!(matches!(
        error,
        CatalogServiceError::Catalog(CatalogError::Protected("flats"))
    ));

    fixture
        .catalog
        .delete_my_flat(&builder, flat)
        .expect("flat deletes");
    fixture
        .catalog
        .delete_my_complex(&builder)
        .expect("empty complex deletes");
}

#[test]
fn bound_flats_resist_deletion() {
    let fixture = fixture();
    let (builder, complex, flat) = seeded_inventory(&fixture);
    let (seller, _) = add(&fixture, "Sam", Role::User);

    let view = fixture
        .announcements
        .submit(
            &seller,
            SubmissionPayload {
                residential_complex: complex,
                address: "Quay 12, tower A".into(),
                purpose: Purpose::Apartments,
                room_amount: 2,
                planning: Planning::Studio,
                condition: HouseCondition::Good,
                square: 58,
                kitchen_square: 12,
                balcony: false,
                heating: HeatingType::Gas,
                payment_option: PaymentOption::Mortgage,
                agent_commission: 0,
                communication_method: CommunicationMethod::Phone,
                description: "Two rooms".into(),
                price: 65_000,
                main_photo: "flat.jpg".into(),
                district: "harbor".into(),
                micro_district: "east".into(),
                gallery_photos: Vec::new(),
            },
        )
        .expect("submission");
    fixture
        .announcements
        .approve(
            &builder,
            view.id,
            ApprovalPayload {
                accepted: Some(true),
                flat: Some(flat),
                ..Default::default()
            },
        )
        .expect("approval binds the flat");

    let error = fixture
        .catalog
        .delete_my_flat(&builder, flat)
        .expect_err("bound flats are protected");
    assert!(matches!(
        error,
        CatalogServiceError::Catalog(CatalogError::Protected("announcements"))
    ));

    let free = fixture
        .catalog
        .not_bounded_flats(&builder)
        .expect("free flats list");
    assert!(free.is_empty());
}

#[test]
fn gallery_updates_reconcile_by_photo_id() {
    let fixture = fixture();
    let (builder, _) = add(&fixture, "Bea", Role::Builder);
    let mut payload = complex_payload("Riverside");
    payload.gallery_photos = vec![
        PhotoPayload {
            id: None,
            photo: "one.jpg".into(),
        },
        PhotoPayload {
            id: None,
            photo: "two.jpg".into(),
        },
    ];
    let complex = fixture
        .catalog
        .create_complex(&builder, payload)
        .expect("complex registers");
    assert_eq!(complex.gallery_photos.len(), 2);
    let first = complex.gallery_photos[0].id;

    // Replace the first photo, leave the second untouched, append a third.
    let updated = fixture
        .catalog
        .update_my_complex(
            &builder,
            ComplexUpdate {
                gallery_photos: Some(vec![
                    PhotoPayload {
                        id: Some(first),
                        photo: "one-replaced.jpg".into(),
                    },
                    PhotoPayload {
                        id: None,
                        photo: "three.jpg".into(),
                    },
                ]),
                ..Default::default()
            },
        )
        .expect("update succeeds");
    let photos: Vec<&str> = updated
        .gallery_photos
        .iter()
        .map(|photo| photo.photo.as_str())
        .collect();
    assert_eq!(photos, vec!["one-replaced.jpg", "two.jpg", "three.jpg"]);
}

#[test]
fn photo_deletion_respects_ownership() {
    let fixture = fixture();
    let (builder, _) = add(&fixture, "Bea", Role::Builder);
    let mut payload = complex_payload("Riverside");
    payload.gallery_photos = vec![PhotoPayload {
        id: None,
        photo: "one.jpg".into(),
    }];
    let complex = fixture
        .catalog
        .create_complex(&builder, payload)
        .expect("complex registers");
    let photo = complex.gallery_photos[0].id;

    let (stranger, _) = add(&fixture, "Eve", Role::User);
    let error = fixture
        .catalog
        .delete_photo(&stranger, photo)
        .expect_err("strangers cannot edit the gallery");
    assert!(matches!(error, CatalogServiceError::Forbidden));

    let (manager, _) = add(&fixture, "Mia", Role::Manager);
    fixture
        .catalog
        .delete_photo(&manager, photo)
        .expect("moderators may remove photos");
    let reloaded = fixture
        .catalog
        .complex_detail(complex.id)
        .expect("complex loads");
    assert!(reloaded.gallery_photos.is_empty());
}

mod routing {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use estate_market::marketplace::catalog::catalog_router;
    use tower::ServiceExt;

    fn complex_body() -> Body {
        Body::from(
            serde_json::to_vec(&serde_json::json!({
                "name": "Riverside Towers",
                "address": "Quay 12",
                "description": "Waterfront",
                "house_status": "flats",
                "house_class": "common",
                "territory_type": "closed",
                "price_for_meter": 1350.0,
                "min_price": 42000,
                "main_photo": "main.jpg"
            }))
            .expect("payload serializes"),
        )
    }

    #[tokio::test]
    async fn only_builders_register_complexes() {
        let fixture = fixture();
        let (_, user_token) = add(&fixture, "Ann", Role::User);
        let (_, builder_token) = add(&fixture, "Bea", Role::Builder);
        let router = catalog_router(fixture.catalog.clone(), fixture.store.clone());

        let response = router
            .clone()
            .oneshot(
                Request::post("/api/v1/residential-complexes")
                    .header("authorization", format!("Bearer {user_token}"))
                    .header("content-type", "application/json")
                    .body(complex_body())
                    .expect("request"),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = router
            .oneshot(
                Request::post("/api/v1/residential-complexes")
                    .header("authorization", format!("Bearer {builder_token}"))
                    .header("content-type", "application/json")
                    .body(complex_body())
                    .expect("request"),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn protected_deletions_surface_as_conflicts() {
        let fixture = fixture();
        let (builder, builder_token) = add(&fixture, "Bea", Role::Builder);
        fixture
            .catalog
            .create_complex(&builder, complex_payload("Riverside"))
            .expect("complex registers");
        let corps = fixture.catalog.create_corps(&builder).expect("corps");
        let section = fixture.catalog.create_section(&builder).expect("section");
        let floor = fixture.catalog.create_floor(&builder).expect("floor");
        fixture
            .catalog
            .create_flat(
                &builder,
                flat_payload(CorpsId(corps.id), SectionId(section.id), FloorId(floor.id)),
            )
            .expect("flat");

        let router = catalog_router(fixture.catalog.clone(), fixture.store.clone());
        let response = router
            .oneshot(
                Request::delete("/api/v1/residential-complexes/my")
                    .header("authorization", format!("Bearer {builder_token}"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
