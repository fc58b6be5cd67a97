//! Integration specifications for the announcement lifecycle: submission,
//! builder approval with chessboard placement, moderation call-off, and
//! the promotion-ordered public feed, exercised through the service
//! facades and the HTTP routers.

mod common {
    use std::sync::Arc;

    use estate_market::marketplace::announcements::{
        AnnouncementService, CommunicationMethod, HeatingType, HouseCondition, PaymentOption,
        Planning, Purpose, SubmissionPayload,
    };
    use estate_market::marketplace::catalog::domain::{
        ComplexId, ComplexPayload, CorpsId, FlatCondition, FlatId, FlatPayload, FloorId,
        HouseClass, HouseStatus, SectionId, TerritoryType,
    };
    use estate_market::marketplace::catalog::CatalogService;
    use estate_market::marketplace::store::MemoryStore;
    use estate_market::marketplace::users::{Principal, Role, User, UserDirectory};

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

    pub(super) fn principal(user: &User) -> Principal {
        Principal {
            user_id: user.id,
            role: user.role,
        }
    }

    pub(super) fn add(fixture: &Fixture, name: &str, role: Role) -> (Principal, String) {
        let email = format!("{}@estate.test", name.to_lowercase());
        let (user, token) = fixture.store.add_user(name, "Tester", &email, role);
        (principal(&user), token)
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

    /// Builder with a complex, one corps/section/floor, and one flat.
    pub(super) fn seeded_inventory(fixture: &Fixture) -> (Principal, ComplexId, FlatId) {
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

    pub(super) fn submission(complex: ComplexId) -> SubmissionPayload {
        SubmissionPayload {
            residential_complex: complex,
            address: "Quay 12, tower A".into(),
            purpose: Purpose::Apartments,
            room_amount: 2,
            planning: Planning::Studio,
            condition: HouseCondition::Good,
            square: 58,
            kitchen_square: 12,
            balcony: true,
            heating: HeatingType::Centralized,
            payment_option: PaymentOption::Mortgage,
            agent_commission: 1500,
            communication_method: CommunicationMethod::PhoneMessages,
            description: "Bright two-room flat".into(),
            price: 65_000,
            main_photo: "flat.jpg".into(),
            district: "harbor".into(),
            micro_district: "east".into(),
            gallery_photos: Vec::new(),
        }
    }
}

use common::*;
use estate_market::marketplace::catalog::domain::{CorpsId, FloorId, SectionId};
use estate_market::marketplace::catalog::gallery::PhotoPayload;
use estate_market::marketplace::announcements::{
    announcement_router, AnnouncementFilter, AnnouncementServiceError, ApprovalPayload,
    CallOffPayload, RejectionReason, UpdatePayload,
};
use estate_market::marketplace::users::Role;

#[test]
fn submission_rejects_out_of_range_fields() {
    let fixture = fixture();
    let (_, complex, _) = seeded_inventory(&fixture);
    let (seller, _) = add(&fixture, "Sam", Role::User);

    let mut payload = submission(complex);
    payload.room_amount = 6;
    let error = fixture
        .announcements
        .submit(&seller, payload)
        .expect_err("six rooms is out of range");
    assert!(matches!(
        error,
        AnnouncementServiceError::Validation { field: "room_amount", .. }
    ));

    let mut payload = submission(complex);
    payload.price = 0;
    assert!(fixture.announcements.submit(&seller, payload).is_err());

    let mut payload = submission(complex);
    payload.kitchen_square = payload.square + 1;
    assert!(fixture.announcements.submit(&seller, payload).is_err());
}

#[test]
fn fresh_submission_is_pending_and_hidden_from_the_feed() {
    let fixture = fixture();
    let (_, complex, _) = seeded_inventory(&fixture);
    let (seller, _) = add(&fixture, "Sam", Role::User);

    let view = fixture
        .announcements
        .submit(&seller, submission(complex))
        .expect("submission succeeds");
    assert!(!view.accepted);
    assert!(!view.called_off);
    assert!(view.flat.is_none());

    let feed = fixture
        .announcements
        .public_cards(&AnnouncementFilter::default())
        .expect("feed builds");
    assert!(feed.is_empty());
}

#[test]
fn accepting_without_a_bound_flat_is_rejected() {
    let fixture = fixture();
    let (builder, complex, _) = seeded_inventory(&fixture);
    let (seller, _) = add(&fixture, "Sam", Role::User);
    let view = fixture
        .announcements
        .submit(&seller, submission(complex))
        .expect("submission succeeds");

    let error = fixture
        .announcements
        .approve(
            &builder,
            view.id,
            ApprovalPayload {
                accepted: Some(true),
                flat: None,
                ..Default::default()
            },
        )
        .expect_err("acceptance requires a flat");
    assert!(matches!(
        error,
        AnnouncementServiceError::Validation { field: "flat", .. }
    ));
}

#[test]
fn approval_binds_the_flat_and_creates_the_grid_once() {
    let fixture = fixture();
    let (builder, complex, flat) = seeded_inventory(&fixture);
    let (seller, _) = add(&fixture, "Sam", Role::User);
    let view = fixture
        .announcements
        .submit(&seller, submission(complex))
        .expect("submission succeeds");

    let approved = fixture
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
        .expect("approval succeeds");
    assert!(approved.accepted);
    assert_eq!(approved.flat, Some(flat));

    let grids = fixture
        .announcements
        .chessboards(complex)
        .expect("grids load");
    assert_eq!(grids.len(), 1);
    assert_eq!(grids[0].announcements.len(), 1);

    // A later decision touching the same flat reuses the grid.
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
        .expect("re-approval succeeds");
    let grids = fixture
        .announcements
        .chessboards(complex)
        .expect("grids load");
    assert_eq!(grids.len(), 1);
}

#[test]
fn approval_applies_listing_updates_and_gallery_changes() {
    let fixture = fixture();
    let (builder, complex, flat) = seeded_inventory(&fixture);
    let (seller, _) = add(&fixture, "Sam", Role::User);
    let mut payload = submission(complex);
    payload.gallery_photos = vec![PhotoPayload {
        id: None,
        photo: "one.jpg".into(),
    }];
    let view = fixture
        .announcements
        .submit(&seller, payload)
        .expect("submission succeeds");
    let first = view.gallery_photos[0].id;

    let approved = fixture
        .announcements
        .approve(
            &builder,
            view.id,
            ApprovalPayload {
                accepted: Some(true),
                flat: Some(flat),
                fields: UpdatePayload {
                    price: Some(70_000),
                    description: Some("Corner flat, river view".into()),
                    gallery_photos: Some(vec![
                        PhotoPayload {
                            id: Some(first),
                            photo: "one-retouched.jpg".into(),
                        },
                        PhotoPayload {
                            id: None,
                            photo: "two.jpg".into(),
                        },
                    ]),
                    ..Default::default()
                },
            },
        )
        .expect("approval succeeds");
    assert!(approved.accepted);
    assert_eq!(approved.price, 70_000);
    assert_eq!(approved.description, "Corner flat, river view");
    let photos: Vec<&str> = approved
        .gallery_photos
        .iter()
        .map(|photo| photo.photo.as_str())
        .collect();
    assert_eq!(photos, vec!["one-retouched.jpg", "two.jpg"]);

    // An invalid rider field aborts the whole approval.
    let error = fixture
        .announcements
        .approve(
            &builder,
            view.id,
            ApprovalPayload {
                accepted: Some(true),
                flat: None,
                fields: UpdatePayload {
                    price: Some(0),
                    ..Default::default()
                },
            },
        )
        .expect_err("zero price is rejected");
    assert!(matches!(
        error,
        AnnouncementServiceError::Validation { field: "price", .. }
    ));
}

#[test]
fn a_flat_can_back_only_one_announcement() {
    let fixture = fixture();
    let (builder, complex, flat) = seeded_inventory(&fixture);
    let (seller, _) = add(&fixture, "Sam", Role::User);
    let (rival, _) = add(&fixture, "Rex", Role::User);

    let first = fixture
        .announcements
        .submit(&seller, submission(complex))
        .expect("first submission");
    fixture
        .announcements
        .approve(
            &builder,
            first.id,
            ApprovalPayload {
                accepted: Some(true),
                flat: Some(flat),
                ..Default::default()
            },
        )
        .expect("first approval");

    let second = fixture
        .announcements
        .submit(&rival, submission(complex))
        .expect("second submission");
    let error = fixture
        .announcements
        .approve(
            &builder,
            second.id,
            ApprovalPayload {
                accepted: Some(true),
                flat: Some(flat),
                ..Default::default()
            },
        )
        .expect_err("flat is taken");
    assert!(matches!(
        error,
        AnnouncementServiceError::Validation { field: "flat", .. }
    ));
}

#[test]
fn approval_rejects_flats_from_another_complex() {
    let fixture = fixture();
    let (_, complex, _) = seeded_inventory(&fixture);

    // Second builder with their own inventory.
    let (other_builder, _) = add(&fixture, "Ona", Role::Builder);
    fixture
        .catalog
        .create_complex(&other_builder, complex_payload("Hillside"))
        .expect("second complex");
    let corps = fixture.catalog.create_corps(&other_builder).expect("corps");
    let section = fixture
        .catalog
        .create_section(&other_builder)
        .expect("section");
    let floor = fixture.catalog.create_floor(&other_builder).expect("floor");
    let foreign_flat = fixture
        .catalog
        .create_flat(
            &other_builder,
            flat_payload(CorpsId(corps.id), SectionId(section.id), FloorId(floor.id)),
        )
        .expect("foreign flat");

    let (seller, _) = add(&fixture, "Sam", Role::User);
    let view = fixture
        .announcements
        .submit(&seller, submission(complex))
        .expect("submission");

    // The first builder owns the announcement's complex but is handed a
    // flat from the second builder's inventory.
    let owner = fixture
        .catalog
        .complex_detail(complex)
        .expect("complex loads")
        .owner;
    let builder = estate_market::marketplace::users::Principal {
        user_id: owner.id,
        role: Role::Builder,
    };
    let error = fixture
        .announcements
        .approve(
            &builder,
            view.id,
            ApprovalPayload {
                accepted: Some(true),
                flat: Some(foreign_flat.id),
                ..Default::default()
            },
        )
        .expect_err("cross-complex flat is rejected");
    assert!(matches!(
        error,
        AnnouncementServiceError::Validation { field: "flat", .. }
    ));
}

#[test]
fn only_the_complex_owner_may_approve() {
    let fixture = fixture();
    let (_, complex, flat) = seeded_inventory(&fixture);
    let (seller, _) = add(&fixture, "Sam", Role::User);
    let (stranger, _) = add(&fixture, "Eve", Role::Builder);

    let view = fixture
        .announcements
        .submit(&seller, submission(complex))
        .expect("submission");
    let error = fixture
        .announcements
        .approve(
            &stranger,
            view.id,
            ApprovalPayload {
                accepted: Some(true),
                flat: Some(flat),
                ..Default::default()
            },
        )
        .expect_err("stranger cannot approve");
    assert!(matches!(error, AnnouncementServiceError::Forbidden));
}

#[test]
fn call_off_hides_the_listing_and_cannot_be_repeated() {
    let fixture = fixture();
    let (builder, complex, flat) = seeded_inventory(&fixture);
    let (seller, _) = add(&fixture, "Sam", Role::User);
    let view = fixture
        .announcements
        .submit(&seller, submission(complex))
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
        .expect("approval");

    fixture
        .announcements
        .call_off(
            view.id,
            CallOffPayload {
                rejection_reason: RejectionReason::IncorrectPhoto,
            },
        )
        .expect("call-off succeeds");
    let feed = fixture
        .announcements
        .public_cards(&AnnouncementFilter::default())
        .expect("feed builds");
    assert!(feed.is_empty());

    let error = fixture
        .announcements
        .call_off(
            view.id,
            CallOffPayload {
                rejection_reason: RejectionReason::IncorrectPrice,
            },
        )
        .expect_err("second call-off is rejected");
    assert!(matches!(
        error,
        AnnouncementServiceError::Validation { field: "called_off", .. }
    ));

    let restored = fixture
        .announcements
        .allow(view.id)
        .expect("allow succeeds");
    assert!(!restored.called_off);
    assert!(restored.rejection_reason.is_none());
    let feed = fixture
        .announcements
        .public_cards(&AnnouncementFilter::default())
        .expect("feed builds");
    assert_eq!(feed.len(), 1);
}

#[test]
fn feed_filters_on_price_and_district() {
    let fixture = fixture();
    let (builder, complex, flat) = seeded_inventory(&fixture);
    let (seller, _) = add(&fixture, "Sam", Role::User);
    let view = fixture
        .announcements
        .submit(&seller, submission(complex))
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
        .expect("approval");

    let matching = AnnouncementFilter {
        district: Some("harbor".into()),
        price_min: Some(60_000),
        price_max: Some(70_000),
        ..Default::default()
    };
    assert_eq!(
        fixture
            .announcements
            .public_cards(&matching)
            .expect("feed")
            .len(),
        1
    );

    let too_expensive = AnnouncementFilter {
        price_max: Some(10_000),
        ..Default::default()
    };
    assert!(fixture
        .announcements
        .public_cards(&too_expensive)
        .expect("feed")
        .is_empty());
}

mod routing {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tower::ServiceExt;

    async fn read_json_body(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        serde_json::from_slice(&bytes).expect("body is json")
    }

    #[tokio::test]
    async fn listing_requires_credentials() {
        let fixture = fixture();
        let router = announcement_router(fixture.announcements.clone(), fixture.store.clone());
        let response = router
            .oneshot(
                Request::get("/api/v1/announcements")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn moderators_see_rows_and_users_see_cards() {
        let fixture = fixture();
        let (builder, complex, flat) = seeded_inventory(&fixture);
        let (seller, _) = add(&fixture, "Sam", Role::User);
        let (_, user_token) = add(&fixture, "Ann", Role::User);
        let (_, manager_token) = add(&fixture, "Mia", Role::Manager);

        let view = fixture
            .announcements
            .submit(&seller, submission(complex))
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
            .expect("approval");

        let router = announcement_router(fixture.announcements.clone(), fixture.store.clone());

        let response = router
            .clone()
            .oneshot(
                Request::get("/api/v1/announcements")
                    .header("authorization", format!("Bearer {user_token}"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
        let cards = read_json_body(response).await;
        let card = &cards.as_array().expect("array")[0];
        assert!(card.get("main_photo").is_some());
        assert!(card.get("accepted").is_none());

        let response = router
            .oneshot(
                Request::get("/api/v1/announcements")
                    .header("authorization", format!("Bearer {manager_token}"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
        let rows = read_json_body(response).await;
        let row = &rows.as_array().expect("array")[0];
        assert_eq!(row.get("accepted"), Some(&Value::Bool(true)));
        assert!(row.get("author").is_some());
    }

    #[tokio::test]
    async fn builders_cannot_submit_announcements() {
        let fixture = fixture();
        let (_, complex, _) = seeded_inventory(&fixture);
        let (_, builder_token) = add(&fixture, "Bob", Role::Builder);

        let router = announcement_router(fixture.announcements.clone(), fixture.store.clone());
        let response = router
            .oneshot(
                Request::post("/api/v1/announcements/create")
                    .header("authorization", format!("Bearer {builder_token}"))
                    .header("content-type", "application/json")
                    .body(Body::from(
                        serde_json::to_vec(&serde_json::json!({
                            "residential_complex": complex.0,
                            "address": "Quay 12",
                            "purpose": "apartments",
                            "room_amount": 2,
                            "planning": "studio",
                            "condition": "good",
                            "square": 58,
                            "kitchen_square": 12,
                            "heating": "gas",
                            "payment_option": "mortgage",
                            "communication_method": "phone",
                            "description": "",
                            "price": 65000,
                            "main_photo": "x.jpg",
                            "district": "harbor",
                            "micro_district": "east"
                        }))
                        .expect("payload serializes"),
                    ))
                    .expect("request"),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn moderation_rides_patch_not_post() {
        let fixture = fixture();
        let (builder, complex, flat) = seeded_inventory(&fixture);
        let (seller, _) = add(&fixture, "Sam", Role::User);
        let (_, manager_token) = add(&fixture, "Mia", Role::Manager);

        let view = fixture
            .announcements
            .submit(&seller, submission(complex))
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
            .expect("approval");

        let router = announcement_router(fixture.announcements.clone(), fixture.store.clone());
        let path = format!("/api/v1/announcements/{}/call-off", view.id.0);
        let body = serde_json::to_vec(&serde_json::json!({
            "rejection_reason": "incorrect-photo"
        }))
        .expect("payload serializes");

        let response = router
            .clone()
            .oneshot(
                Request::post(path.as_str())
                    .header("authorization", format!("Bearer {manager_token}"))
                    .header("content-type", "application/json")
                    .body(Body::from(body.clone()))
                    .expect("request"),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

        let response = router
            .clone()
            .oneshot(
                Request::patch(path.as_str())
                    .header("authorization", format!("Bearer {manager_token}"))
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .expect("request"),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
        let called_off = read_json_body(response).await;
        assert_eq!(called_off.get("called_off"), Some(&Value::Bool(true)));

        let response = router
            .oneshot(
                Request::patch(format!(
                    "/api/v1/announcements/{}/allow",
                    view.id.0
                ))
                .header("authorization", format!("Bearer {manager_token}"))
                .body(Body::empty())
                .expect("request"),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
        let restored = read_json_body(response).await;
        assert_eq!(restored.get("called_off"), Some(&Value::Bool(false)));
    }

    #[tokio::test]
    async fn blocked_accounts_are_turned_away() {
        let fixture = fixture();
        let (user, token) = fixture.store.add_user(
            "Zed",
            "Tester",
            "zed@estate.test",
            Role::User,
        );
        fixture.store.block_user(user.id);

        let router = announcement_router(fixture.announcements.clone(), fixture.store.clone());
        let response = router
            .oneshot(
                Request::get("/api/v1/announcements")
                    .header("authorization", format!("Bearer {token}"))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
