use serde::Deserialize;

use super::domain::{Announcement, HouseCondition, PaymentOption, Purpose};
use crate::marketplace::catalog::domain::HouseStatus;

/// Query-string filter over the public feed. All bounds are inclusive
/// and every present field must match. `page`/`page_size` slice the
/// result after ordering; both must be present for paging to apply.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnnouncementFilter {
    pub house_status: Option<HouseStatus>,
    pub purpose: Option<Purpose>,
    pub payment_option: Option<PaymentOption>,
    pub condition: Option<HouseCondition>,
    pub district: Option<String>,
    pub micro_district: Option<String>,
    pub room_amount: Option<u8>,
    pub price_min: Option<u64>,
    pub price_max: Option<u64>,
    pub square_min: Option<u32>,
    pub square_max: Option<u32>,
    pub page: Option<usize>,
    pub page_size: Option<usize>,
}

impl AnnouncementFilter {
    /// `house_status` comes from the announcement's residential complex,
    /// resolved by the caller.
    pub fn matches(&self, announcement: &Announcement, house_status: HouseStatus) -> bool {
        if let Some(wanted) = self.house_status {
            if wanted != house_status {
                return false;
            }
        }
        if let Some(purpose) = self.purpose {
            if announcement.purpose != purpose {
                return false;
            }
        }
        if let Some(payment_option) = self.payment_option {
            if announcement.payment_option != payment_option {
                return false;
            }
        }
        if let Some(condition) = self.condition {
            if announcement.condition != condition {
                return false;
            }
        }
        if let Some(district) = &self.district {
            if &announcement.district != district {
                return false;
            }
        }
        if let Some(micro_district) = &self.micro_district {
            if &announcement.micro_district != micro_district {
                return false;
            }
        }
        if let Some(room_amount) = self.room_amount {
            if announcement.room_amount != room_amount {
                return false;
            }
        }
        if let Some(min) = self.price_min {
            if announcement.price < min {
                return false;
            }
        }
        if let Some(max) = self.price_max {
            if announcement.price > max {
                return false;
            }
        }
        if let Some(min) = self.square_min {
            if announcement.square < min {
                return false;
            }
        }
        if let Some(max) = self.square_max {
            if announcement.square > max {
                return false;
            }
        }
        true
    }

    /// One-based page slice over an already ordered result set.
    pub fn paginate<T>(&self, items: Vec<T>) -> Vec<T> {
        match (self.page, self.page_size) {
            (Some(page), Some(size)) if page >= 1 && size >= 1 => items
                .into_iter()
                .skip((page - 1) * size)
                .take(size)
                .collect(),
            _ => items,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::marketplace::announcements::domain::{
        next_announcement_id, CommunicationMethod, HeatingType, HouseCondition, PaymentOption,
        Planning, Purpose,
    };
    use crate::marketplace::catalog::domain::ComplexId;
    use crate::marketplace::catalog::gallery::GalleryId;
    use crate::marketplace::users::UserId;

    fn sample(price: u64, square: u32, district: &str) -> Announcement {
        Announcement {
            id: next_announcement_id(),
            author: UserId(1),
            residential_complex: ComplexId(1),
            address: "Main st. 1".into(),
            purpose: Purpose::Apartments,
            room_amount: 2,
            planning: Planning::Studio,
            condition: HouseCondition::Good,
            square,
            kitchen_square: 10,
            balcony: true,
            heating: HeatingType::Gas,
            payment_option: PaymentOption::Mortgage,
            agent_commission: 0,
            communication_method: CommunicationMethod::Phone,
            description: String::new(),
            price,
            main_photo: String::new(),
            district: district.into(),
            micro_district: "center".into(),
            gallery: GalleryId(1),
            accepted: true,
            called_off: false,
            rejection_reason: None,
            flat: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn empty_filter_matches_everything() {
        let filter = AnnouncementFilter::default();
        assert!(filter.matches(&sample(100, 40, "north"), HouseStatus::Flats));
    }

    #[test]
    fn price_bounds_are_inclusive() {
        let filter = AnnouncementFilter {
            price_min: Some(100),
            price_max: Some(200),
            ..Default::default()
        };
        assert!(filter.matches(&sample(100, 40, "north"), HouseStatus::Flats));
        assert!(filter.matches(&sample(200, 40, "north"), HouseStatus::Flats));
        assert!(!filter.matches(&sample(99, 40, "north"), HouseStatus::Flats));
        assert!(!filter.matches(&sample(201, 40, "north"), HouseStatus::Flats));
    }

    #[test]
    fn district_and_house_status_must_both_match() {
        let filter = AnnouncementFilter {
            district: Some("north".into()),
            house_status: Some(HouseStatus::Cottage),
            ..Default::default()
        };
        assert!(!filter.matches(&sample(100, 40, "north"), HouseStatus::Flats));
        assert!(filter.matches(&sample(100, 40, "north"), HouseStatus::Cottage));
        assert!(!filter.matches(&sample(100, 40, "south"), HouseStatus::Cottage));
    }

    #[test]
    fn payment_option_and_purpose_narrow_the_feed() {
        let filter = AnnouncementFilter {
            purpose: Some(Purpose::Apartments),
            payment_option: Some(PaymentOption::ParentCapital),
            ..Default::default()
        };
        assert!(!filter.matches(&sample(100, 40, "north"), HouseStatus::Flats));
        let filter = AnnouncementFilter {
            payment_option: Some(PaymentOption::Mortgage),
            condition: Some(HouseCondition::Good),
            ..Default::default()
        };
        assert!(filter.matches(&sample(100, 40, "north"), HouseStatus::Flats));
    }

    #[test]
    fn pagination_slices_after_ordering() {
        let filter = AnnouncementFilter {
            page: Some(2),
            page_size: Some(2),
            ..Default::default()
        };
        assert_eq!(filter.paginate(vec![1, 2, 3, 4, 5]), vec![3, 4]);
        assert_eq!(
            AnnouncementFilter::default().paginate(vec![1, 2, 3]),
            vec![1, 2, 3]
        );
        let out_of_range = AnnouncementFilter {
            page: Some(9),
            page_size: Some(2),
            ..Default::default()
        };
        assert!(out_of_range.paginate(vec![1, 2, 3]).is_empty());
    }

    #[test]
    fn square_range_filters_out_of_band_listings() {
        let filter = AnnouncementFilter {
            square_min: Some(30),
            square_max: Some(60),
            ..Default::default()
        };
        assert!(filter.matches(&sample(100, 45, "north"), HouseStatus::Flats));
        assert!(!filter.matches(&sample(100, 20, "north"), HouseStatus::Flats));
        assert!(!filter.matches(&sample(100, 80, "north"), HouseStatus::Flats));
    }
}
