//! Action-level permission rules.
//!
//! Each action carries an ordered list of (role predicate, response shape)
//! pairs evaluated top to bottom; the first matching rule both authorizes
//! the call and selects the view the caller gets back. No matching rule
//! means a flat denial with no further detail.

use super::users::Role;

/// Every gated endpoint maps to one of these actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    ListAnnouncements,
    RetrieveAnnouncement,
    SubmitAnnouncement,
    ApproveAnnouncement,
    ModerateAnnouncement,
    AttachPromotion,
    ManagePromotionTypes,
    ListPromotionTypes,
    ManageOwnInventory,
    BrowseCatalog,
    ModerateCatalog,
}

/// Which serializer shape the matched rule selects for the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// Public announcement card (id, photo, price, payment option, condition).
    PublicCard,
    /// Moderation row with acceptance/call-off state and creator.
    ModerationRow,
    /// Full detail view including gallery and promotion.
    Detail,
    /// Plain payload, no alternate serializer.
    Plain,
}

/// One entry of an action's rule list.
pub struct AccessRule {
    pub allows: fn(Role) -> bool,
    pub shape: ResponseShape,
}

fn any(_: Role) -> bool {
    true
}

fn moderator(role: Role) -> bool {
    role.is_moderator()
}

fn builder(role: Role) -> bool {
    role == Role::Builder
}

fn end_user(role: Role) -> bool {
    role == Role::User
}

/// Ordered rule list for an action; first match wins.
pub fn rules_for(action: Action) -> &'static [AccessRule] {
    match action {
        Action::ListAnnouncements => &[
            AccessRule {
                allows: moderator,
                shape: ResponseShape::ModerationRow,
            },
            AccessRule {
                allows: any,
                shape: ResponseShape::PublicCard,
            },
        ],
        Action::RetrieveAnnouncement => &[AccessRule {
            allows: any,
            shape: ResponseShape::Detail,
        }],
        Action::SubmitAnnouncement => &[AccessRule {
            allows: end_user,
            shape: ResponseShape::Detail,
        }],
        Action::ApproveAnnouncement => &[AccessRule {
            allows: builder,
            shape: ResponseShape::Detail,
        }],
        Action::ModerateAnnouncement => &[AccessRule {
            allows: moderator,
            shape: ResponseShape::ModerationRow,
        }],
        Action::AttachPromotion => &[AccessRule {
            allows: end_user,
            shape: ResponseShape::Plain,
        }],
        Action::ManagePromotionTypes => &[AccessRule {
            allows: moderator,
            shape: ResponseShape::Plain,
        }],
        Action::ListPromotionTypes => &[AccessRule {
            allows: any,
            shape: ResponseShape::Plain,
        }],
        Action::ManageOwnInventory => &[AccessRule {
            allows: builder,
            shape: ResponseShape::Plain,
        }],
        Action::BrowseCatalog => &[AccessRule {
            allows: any,
            shape: ResponseShape::Plain,
        }],
        Action::ModerateCatalog => &[AccessRule {
            allows: moderator,
            shape: ResponseShape::Plain,
        }],
    }
}

/// Evaluate the rule list for `action`; `None` is a flat permission denial.
pub fn resolve(action: Action, role: Role) -> Option<ResponseShape> {
    rules_for(action)
        .iter()
        .find(|rule| (rule.allows)(role))
        .map(|rule| rule.shape)
}
