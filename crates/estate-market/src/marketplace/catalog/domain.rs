use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::gallery::{GalleryId, PhotoPayload, PhotoView};
use crate::marketplace::users::{UserId, UserView};

macro_rules! id_newtype {
    ($(#[$doc:meta])* $name:ident, $seq:ident, $next:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub u64);

        static $seq: AtomicU64 = AtomicU64::new(1);

        pub fn $next() -> $name {
            $name($seq.fetch_add(1, Ordering::Relaxed))
        }
    };
}

id_newtype!(
    /// Identifier of a residential complex.
    ComplexId,
    COMPLEX_SEQUENCE,
    next_complex_id
);
id_newtype!(
    /// Identifier of a corps inside a complex.
    CorpsId,
    CORPS_SEQUENCE,
    next_corps_id
);
id_newtype!(
    /// Identifier of a section inside a complex.
    SectionId,
    SECTION_SEQUENCE,
    next_section_id
);
id_newtype!(
    /// Identifier of a floor inside a complex.
    FloorId,
    FLOOR_SEQUENCE,
    next_floor_id
);
id_newtype!(
    /// Identifier of a concrete flat.
    FlatId,
    FLAT_SEQUENCE,
    next_flat_id
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HouseStatus {
    Flats,
    Cottage,
    ManyFloors,
    SecondaryMarket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HouseClass {
    Lux,
    Elite,
    Common,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TerritoryType {
    Closed,
    ClosedAndSecured,
    Opened,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlatCondition {
    Draft,
    LivingCondition,
}

/// A builder-owned residential complex. Each builder owns at most one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResidentialComplex {
    pub id: ComplexId,
    pub owner: UserId,
    pub name: String,
    pub address: String,
    pub description: String,
    pub house_status: HouseStatus,
    pub house_class: HouseClass,
    pub territory_type: TerritoryType,
    pub price_for_meter: f64,
    pub min_price: u64,
    pub main_photo: String,
    pub gallery: GalleryId,
}

/// Named subdivision of a complex, auto-numbered on creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Corps {
    pub id: CorpsId,
    pub residential_complex: ComplexId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub id: SectionId,
    pub residential_complex: ComplexId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Floor {
    pub id: FloorId,
    pub residential_complex: ComplexId,
    pub name: String,
}

/// A concrete apartment unit inside one corps/section/floor of a complex.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flat {
    pub id: FlatId,
    pub residential_complex: ComplexId,
    pub corps: CorpsId,
    pub section: SectionId,
    pub floor: FloorId,
    pub district: String,
    pub micro_district: String,
    pub room_amount: u8,
    pub scheme: String,
    pub square: u32,
    pub price: u64,
    pub condition: FlatCondition,
    pub gallery: GalleryId,
    pub created_at: DateTime<Utc>,
}

/// Inbound payload for registering a residential complex.
#[derive(Debug, Clone, Deserialize)]
pub struct ComplexPayload {
    pub name: String,
    pub address: String,
    pub description: String,
    pub house_status: HouseStatus,
    pub house_class: HouseClass,
    pub territory_type: TerritoryType,
    pub price_for_meter: f64,
    pub min_price: u64,
    pub main_photo: String,
    #[serde(default)]
    pub gallery_photos: Vec<PhotoPayload>,
}

/// Partial update for a builder's own complex.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComplexUpdate {
    pub name: Option<String>,
    pub address: Option<String>,
    pub description: Option<String>,
    pub house_status: Option<HouseStatus>,
    pub house_class: Option<HouseClass>,
    pub territory_type: Option<TerritoryType>,
    pub price_for_meter: Option<f64>,
    pub min_price: Option<u64>,
    pub main_photo: Option<String>,
    pub gallery_photos: Option<Vec<PhotoPayload>>,
}

/// Inbound payload for creating a flat inside the builder's own complex.
#[derive(Debug, Clone, Deserialize)]
pub struct FlatPayload {
    pub corps: CorpsId,
    pub section: SectionId,
    pub floor: FloorId,
    pub district: String,
    pub micro_district: String,
    pub room_amount: u8,
    pub scheme: String,
    pub square: u32,
    pub price: u64,
    pub condition: FlatCondition,
    #[serde(default)]
    pub gallery_photos: Vec<PhotoPayload>,
}

/// Partial update for an existing flat.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlatUpdate {
    pub district: Option<String>,
    pub micro_district: Option<String>,
    pub room_amount: Option<u8>,
    pub scheme: Option<String>,
    pub square: Option<u32>,
    pub price: Option<u64>,
    pub condition: Option<FlatCondition>,
    pub gallery_photos: Option<Vec<PhotoPayload>>,
}

/// Aggregated square/price information across a complex's flats.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatsInformation {
    pub maximal_square: Option<u32>,
    pub minimal_square: Option<u32>,
    pub minimal_price: Option<u64>,
}

/// Full complex view with owner card and ordered gallery.
#[derive(Debug, Clone, Serialize)]
pub struct ComplexView {
    pub id: ComplexId,
    pub owner: UserView,
    pub name: String,
    pub address: String,
    pub description: String,
    pub house_status: HouseStatus,
    pub house_class: HouseClass,
    pub territory_type: TerritoryType,
    pub price_for_meter: f64,
    pub min_price: u64,
    pub main_photo: String,
    pub flats_information: FlatsInformation,
    pub gallery_photos: Vec<PhotoView>,
}

/// Corps/section/floor row with the number of flats referencing it.
#[derive(Debug, Clone, Serialize)]
pub struct SubdivisionView {
    pub id: u64,
    pub name: String,
    pub flat_amount: usize,
}

/// Flat view with its subdivision names resolved.
#[derive(Debug, Clone, Serialize)]
pub struct FlatView {
    pub id: FlatId,
    pub residential_complex: ComplexId,
    pub corps: String,
    pub section: String,
    pub floor: String,
    pub district: String,
    pub micro_district: String,
    pub room_amount: u8,
    pub scheme: String,
    pub square: u32,
    pub price: u64,
    pub condition: FlatCondition,
    pub gallery_photos: Vec<PhotoView>,
}
