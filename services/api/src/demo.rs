use crate::infra::Services;
use chrono::{Months, Utc};
use clap::Args;
use estate_market::error::AppError;
use estate_market::marketplace::announcements::{
    AnnouncementFilter, ApprovalPayload, CallOffPayload, CommunicationMethod, HeatingType,
    HouseCondition, PaymentOption, Planning, Purpose, RejectionReason, SubmissionPayload,
};
use estate_market::marketplace::catalog::domain::{
    ComplexPayload, CorpsId, FlatCondition, FlatPayload, FloorId, HouseClass, HouseStatus,
    SectionId, TerritoryType,
};
use estate_market::marketplace::favorites::FavoriteAnnouncementPayload;
use estate_market::marketplace::promotions::{AttachPayload, PromotionColor, PromotionTypePayload};
use estate_market::marketplace::subscriptions::{SubscribePayload, SubscriptionTier};
use estate_market::marketplace::users::{Principal, Role, User};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Skip the moderation call-off portion of the demo.
    #[arg(long)]
    pub(crate) skip_moderation: bool,
}

fn principal(user: &User) -> Principal {
    Principal {
        user_id: user.id,
        role: user.role,
    }
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    println!("Estate market demo");

    let services = Services::new();
    let (builder, _) = services
        .store
        .add_user("Bea", "Stone", "bea@estate.test", Role::Builder);
    let (seller, _) = services
        .store
        .add_user("Sam", "Reyes", "sam@estate.test", Role::User);
    let (buyer, _) = services
        .store
        .add_user("Ann", "Kim", "ann@estate.test", Role::User);
    let builder = principal(&builder);
    let seller = principal(&seller);
    let buyer = principal(&buyer);

    println!("\nBuilder inventory");
    let complex = match services.catalog.create_complex(
        &builder,
        ComplexPayload {
            name: "Riverside Towers".into(),
            address: "Quay 12".into(),
            description: "Two towers on the river bank".into(),
            house_status: HouseStatus::Flats,
            house_class: HouseClass::Common,
            territory_type: TerritoryType::Closed,
            price_for_meter: 1350.0,
            min_price: 42_000,
            main_photo: "riverside.jpg".into(),
            gallery_photos: Vec::new(),
        },
    ) {
        Ok(view) => view,
        Err(err) => {
            println!("  Complex registration failed: {err}");
            return Ok(());
        }
    };
    println!("- Registered complex {} ({})", complex.id.0, complex.name);

    let corps = match services.catalog.create_corps(&builder) {
        Ok(row) => row,
        Err(err) => {
            println!("  Corps creation failed: {err}");
            return Ok(());
        }
    };
    let section = match services.catalog.create_section(&builder) {
        Ok(row) => row,
        Err(err) => {
            println!("  Section creation failed: {err}");
            return Ok(());
        }
    };
    let floor = match services.catalog.create_floor(&builder) {
        Ok(row) => row,
        Err(err) => {
            println!("  Floor creation failed: {err}");
            return Ok(());
        }
    };
    println!("- Subdivisions: {} / {} / {}", corps.name, section.name, floor.name);

    let flat = match services.catalog.create_flat(
        &builder,
        FlatPayload {
            corps: CorpsId(corps.id),
            section: SectionId(section.id),
            floor: FloorId(floor.id),
            district: "harbor".into(),
            micro_district: "east".into(),
            room_amount: 2,
            scheme: "scheme-2a.png".into(),
            square: 58,
            price: 61_000,
            condition: FlatCondition::LivingCondition,
            gallery_photos: Vec::new(),
        },
    ) {
        Ok(view) => view,
        Err(err) => {
            println!("  Flat creation failed: {err}");
            return Ok(());
        }
    };
    println!("- Flat {} added ({} m², {})", flat.id.0, flat.square, flat.district);

    println!("\nAnnouncement lifecycle");
    let announcement = match services.announcements.submit(
        &seller,
        SubmissionPayload {
            residential_complex: complex.id,
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
            main_photo: "flat-main.jpg".into(),
            district: "harbor".into(),
            micro_district: "east".into(),
            gallery_photos: Vec::new(),
        },
    ) {
        Ok(view) => view,
        Err(err) => {
            println!("  Submission rejected: {err}");
            return Ok(());
        }
    };
    println!(
        "- Submitted announcement {} (accepted: {})",
        announcement.id.0, announcement.accepted
    );

    let approved = match services.announcements.approve(
        &builder,
        announcement.id,
        ApprovalPayload {
            accepted: Some(true),
            flat: Some(flat.id),
            ..Default::default()
        },
    ) {
        Ok(view) => view,
        Err(err) => {
            println!("  Approval failed: {err}");
            return Ok(());
        }
    };
    println!(
        "- Approved and bound to flat {:?}; grids for complex: {}",
        approved.flat.map(|id| id.0),
        services
            .announcements
            .chessboards(complex.id)
            .map(|grids| grids.len())
            .unwrap_or(0)
    );

    println!("\nPromotion");
    let tariff = match services.promotions.create_type(PromotionTypePayload {
        name: "Big advert".into(),
        price: 49.0,
        efficiency: 75,
    }) {
        Ok(tariff) => tariff,
        Err(err) => {
            println!("  Tariff creation failed: {err}");
            return Ok(());
        }
    };
    match services.promotions.attach(
        &seller,
        announcement.id,
        tariff.id,
        AttachPayload {
            logo: "rocket.png".into(),
            header: Some("Hot offer".into()),
            color: Some(PromotionColor::Green),
        },
    ) {
        Ok(view) => println!("- Attached '{}' (efficiency {})", view.name, view.efficiency),
        Err(err) => println!("  Promotion attach failed: {err}"),
    }

    match services.announcements.public_cards(&AnnouncementFilter::default()) {
        Ok(cards) => match serde_json::to_string_pretty(&cards) {
            Ok(json) => println!("\nPublic feed:\n{json}"),
            Err(err) => println!("  Feed serialization failed: {err}"),
        },
        Err(err) => println!("  Feed unavailable: {err}"),
    }

    if !args.skip_moderation {
        println!("\nModeration");
        match services.announcements.call_off(
            announcement.id,
            CallOffPayload {
                rejection_reason: RejectionReason::IncorrectPhoto,
            },
        ) {
            Ok(view) => println!(
                "- Called off (reason {:?}); feed size now {}",
                view.rejection_reason,
                services
                    .announcements
                    .public_cards(&AnnouncementFilter::default())
                    .map(|cards| cards.len())
                    .unwrap_or(0)
            ),
            Err(err) => println!("  Call-off failed: {err}"),
        }
        match services.announcements.allow(announcement.id) {
            Ok(_) => println!("- Allowed back into the feed"),
            Err(err) => println!("  Allow failed: {err}"),
        }
    }

    println!("\nFavorites and subscriptions");
    match services.favorites.add_announcement(
        &buyer,
        FavoriteAnnouncementPayload {
            announcement: announcement.id,
        },
    ) {
        Ok(view) => println!("- Buyer favorited announcement {}", view.announcement.0),
        Err(err) => println!("  Favorite failed: {err}"),
    }
    match services.subscriptions.subscribe(
        &buyer,
        SubscribePayload {
            tier: SubscriptionTier::Common,
            auto_pay: true,
        },
    ) {
        Ok(subscription) => println!(
            "- Buyer subscribed until {}",
            subscription.expire_date.date_naive()
        ),
        Err(err) => println!("  Subscription failed: {err}"),
    }
    match services
        .subscriptions
        .renew_expired(Utc::now() + Months::new(2))
    {
        Ok(renewed) => println!("- Renewal sweep two months out renews {renewed} subscription(s)"),
        Err(err) => println!("  Renewal sweep failed: {err}"),
    }

    Ok(())
}
