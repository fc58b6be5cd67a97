//! Process-local storage backing every repository trait.
//!
//! All tables live in one struct because referential protection crosses
//! them: a complex cannot go away while flats reference it, and a flat
//! cannot go away while an announcement is bound to it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::Utc;

use super::announcements::{
    next_chessboard_id, AnnouncementId, AnnouncementRecord, AnnouncementRepository, ChessBoard,
    ChessBoardKey, RepositoryError,
};
use super::catalog::domain::{
    ComplexId, Corps, CorpsId, Flat, FlatId, Floor, FloorId, ResidentialComplex, Section,
    SectionId,
};
use super::catalog::gallery::{Gallery, GalleryId, PhotoId};
use super::catalog::repository::{CatalogError, CatalogRepository};
use super::favorites::{Favorite, FavoriteId, FavoriteRepository};
use super::messaging::{Message, MessageRepository};
use super::promotions::{PromotionCatalog, PromotionType, PromotionTypeId};
use super::subscriptions::{SubscriptionId, SubscriptionRepository, UserSubscription};
use super::users::{Role, User, UserDirectory, UserId};

#[derive(Default)]
pub struct MemoryStore {
    users: Mutex<HashMap<UserId, User>>,
    tokens: Mutex<HashMap<String, UserId>>,
    user_sequence: AtomicU64,
    complexes: Mutex<HashMap<ComplexId, ResidentialComplex>>,
    corps: Mutex<HashMap<CorpsId, Corps>>,
    sections: Mutex<HashMap<SectionId, Section>>,
    floors: Mutex<HashMap<FloorId, Floor>>,
    flats: Mutex<HashMap<FlatId, Flat>>,
    galleries: Mutex<HashMap<GalleryId, Gallery>>,
    announcements: Mutex<HashMap<AnnouncementId, AnnouncementRecord>>,
    chessboards: Mutex<HashMap<ChessBoardKey, ChessBoard>>,
    promotion_types: Mutex<HashMap<PromotionTypeId, PromotionType>>,
    favorites: Mutex<HashMap<FavoriteId, Favorite>>,
    messages: Mutex<Vec<Message>>,
    subscriptions: Mutex<HashMap<SubscriptionId, UserSubscription>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            user_sequence: AtomicU64::new(1),
            ..Self::default()
        }
    }

    /// Registers a user and mints a bearer token for them.
    pub fn add_user(&self, name: &str, surname: &str, email: &str, role: Role) -> (User, String) {
        let id = UserId(self.user_sequence.fetch_add(1, Ordering::Relaxed));
        let user = User {
            id,
            email: email.to_string(),
            name: name.to_string(),
            surname: surname.to_string(),
            role,
            phone: None,
            is_blocked: false,
        };
        let token = format!("token-{}", id.0);
        self.users
            .lock()
            .expect("store mutex poisoned")
            .insert(id, user.clone());
        self.tokens
            .lock()
            .expect("store mutex poisoned")
            .insert(token.clone(), id);
        (user, token)
    }

    pub fn block_user(&self, id: UserId) {
        if let Some(user) = self
            .users
            .lock()
            .expect("store mutex poisoned")
            .get_mut(&id)
        {
            user.is_blocked = true;
        }
    }
}

impl UserDirectory for MemoryStore {
    fn resolve_token(&self, token: &str) -> Option<User> {
        let id = *self
            .tokens
            .lock()
            .expect("store mutex poisoned")
            .get(token)?;
        UserDirectory::fetch(self, id)
    }

    fn fetch(&self, id: UserId) -> Option<User> {
        self.users
            .lock()
            .expect("store mutex poisoned")
            .get(&id)
            .cloned()
    }
}

impl CatalogRepository for MemoryStore {
    fn insert_complex(&self, complex: ResidentialComplex) -> Result<(), CatalogError> {
        let mut guard = self.complexes.lock().expect("store mutex poisoned");
        if guard.contains_key(&complex.id) {
            return Err(CatalogError::Conflict);
        }
        guard.insert(complex.id, complex);
        Ok(())
    }

    fn complex(&self, id: ComplexId) -> Result<Option<ResidentialComplex>, CatalogError> {
        Ok(self
            .complexes
            .lock()
            .expect("store mutex poisoned")
            .get(&id)
            .cloned())
    }

    fn complex_by_owner(&self, owner: UserId) -> Result<Option<ResidentialComplex>, CatalogError> {
        Ok(self
            .complexes
            .lock()
            .expect("store mutex poisoned")
            .values()
            .find(|complex| complex.owner == owner)
            .cloned())
    }

    fn complexes(&self) -> Result<Vec<ResidentialComplex>, CatalogError> {
        let mut all: Vec<ResidentialComplex> = self
            .complexes
            .lock()
            .expect("store mutex poisoned")
            .values()
            .cloned()
            .collect();
        all.sort_by_key(|complex| complex.id);
        Ok(all)
    }

    fn update_complex(&self, complex: ResidentialComplex) -> Result<(), CatalogError> {
        let mut guard = self.complexes.lock().expect("store mutex poisoned");
        if !guard.contains_key(&complex.id) {
            return Err(CatalogError::NotFound);
        }
        guard.insert(complex.id, complex);
        Ok(())
    }

    fn delete_complex(&self, id: ComplexId) -> Result<(), CatalogError> {
        if !self
            .complexes
            .lock()
            .expect("store mutex poisoned")
            .contains_key(&id)
        {
            return Err(CatalogError::NotFound);
        }
        let has_flats = self
            .flats
            .lock()
            .expect("store mutex poisoned")
            .values()
            .any(|flat| flat.residential_complex == id);
        if has_flats {
            return Err(CatalogError::Protected("flats"));
        }
        let has_announcements = self
            .announcements
            .lock()
            .expect("store mutex poisoned")
            .values()
            .any(|record| record.announcement.residential_complex == id);
        if has_announcements {
            return Err(CatalogError::Protected("announcements"));
        }
        self.complexes
            .lock()
            .expect("store mutex poisoned")
            .remove(&id);
        self.corps
            .lock()
            .expect("store mutex poisoned")
            .retain(|_, corps| corps.residential_complex != id);
        self.sections
            .lock()
            .expect("store mutex poisoned")
            .retain(|_, section| section.residential_complex != id);
        self.floors
            .lock()
            .expect("store mutex poisoned")
            .retain(|_, floor| floor.residential_complex != id);
        self.chessboards
            .lock()
            .expect("store mutex poisoned")
            .retain(|key, _| key.residential_complex != id);
        Ok(())
    }

    fn insert_corps(&self, corps: Corps) -> Result<(), CatalogError> {
        let mut guard = self.corps.lock().expect("store mutex poisoned");
        if guard.contains_key(&corps.id) {
            return Err(CatalogError::Conflict);
        }
        guard.insert(corps.id, corps);
        Ok(())
    }

    fn corps(&self, id: CorpsId) -> Result<Option<Corps>, CatalogError> {
        Ok(self
            .corps
            .lock()
            .expect("store mutex poisoned")
            .get(&id)
            .cloned())
    }

    fn corps_by_complex(&self, complex: ComplexId) -> Result<Vec<Corps>, CatalogError> {
        let mut rows: Vec<Corps> = self
            .corps
            .lock()
            .expect("store mutex poisoned")
            .values()
            .filter(|corps| corps.residential_complex == complex)
            .cloned()
            .collect();
        rows.sort_by_key(|corps| corps.id);
        Ok(rows)
    }

    fn delete_corps(&self, id: CorpsId) -> Result<(), CatalogError> {
        let referenced = self
            .flats
            .lock()
            .expect("store mutex poisoned")
            .values()
            .any(|flat| flat.corps == id);
        if referenced {
            return Err(CatalogError::Protected("flats"));
        }
        self.corps
            .lock()
            .expect("store mutex poisoned")
            .remove(&id)
            .map(|_| ())
            .ok_or(CatalogError::NotFound)
    }

    fn insert_section(&self, section: Section) -> Result<(), CatalogError> {
        let mut guard = self.sections.lock().expect("store mutex poisoned");
        if guard.contains_key(&section.id) {
            return Err(CatalogError::Conflict);
        }
        guard.insert(section.id, section);
        Ok(())
    }

    fn section(&self, id: SectionId) -> Result<Option<Section>, CatalogError> {
        Ok(self
            .sections
            .lock()
            .expect("store mutex poisoned")
            .get(&id)
            .cloned())
    }

    fn sections_by_complex(&self, complex: ComplexId) -> Result<Vec<Section>, CatalogError> {
        let mut rows: Vec<Section> = self
            .sections
            .lock()
            .expect("store mutex poisoned")
            .values()
            .filter(|section| section.residential_complex == complex)
            .cloned()
            .collect();
        rows.sort_by_key(|section| section.id);
        Ok(rows)
    }

    fn delete_section(&self, id: SectionId) -> Result<(), CatalogError> {
        let referenced = self
            .flats
            .lock()
            .expect("store mutex poisoned")
            .values()
            .any(|flat| flat.section == id);
        if referenced {
            return Err(CatalogError::Protected("flats"));
        }
        self.sections
            .lock()
            .expect("store mutex poisoned")
            .remove(&id)
            .map(|_| ())
            .ok_or(CatalogError::NotFound)
    }

    fn insert_floor(&self, floor: Floor) -> Result<(), CatalogError> {
        let mut guard = self.floors.lock().expect("store mutex poisoned");
        if guard.contains_key(&floor.id) {
            return Err(CatalogError::Conflict);
        }
        guard.insert(floor.id, floor);
        Ok(())
    }

    fn floor(&self, id: FloorId) -> Result<Option<Floor>, CatalogError> {
        Ok(self
            .floors
            .lock()
            .expect("store mutex poisoned")
            .get(&id)
            .cloned())
    }

    fn floors_by_complex(&self, complex: ComplexId) -> Result<Vec<Floor>, CatalogError> {
        let mut rows: Vec<Floor> = self
            .floors
            .lock()
            .expect("store mutex poisoned")
            .values()
            .filter(|floor| floor.residential_complex == complex)
            .cloned()
            .collect();
        rows.sort_by_key(|floor| floor.id);
        Ok(rows)
    }

    fn delete_floor(&self, id: FloorId) -> Result<(), CatalogError> {
        let referenced = self
            .flats
            .lock()
            .expect("store mutex poisoned")
            .values()
            .any(|flat| flat.floor == id);
        if referenced {
            return Err(CatalogError::Protected("flats"));
        }
        self.floors
            .lock()
            .expect("store mutex poisoned")
            .remove(&id)
            .map(|_| ())
            .ok_or(CatalogError::NotFound)
    }

    fn insert_flat(&self, flat: Flat) -> Result<(), CatalogError> {
        let mut guard = self.flats.lock().expect("store mutex poisoned");
        if guard.contains_key(&flat.id) {
            return Err(CatalogError::Conflict);
        }
        guard.insert(flat.id, flat);
        Ok(())
    }

    fn flat(&self, id: FlatId) -> Result<Option<Flat>, CatalogError> {
        Ok(self
            .flats
            .lock()
            .expect("store mutex poisoned")
            .get(&id)
            .cloned())
    }

    fn flats(&self) -> Result<Vec<Flat>, CatalogError> {
        let mut all: Vec<Flat> = self
            .flats
            .lock()
            .expect("store mutex poisoned")
            .values()
            .cloned()
            .collect();
        all.sort_by_key(|flat| flat.id);
        Ok(all)
    }

    fn flats_by_complex(&self, complex: ComplexId) -> Result<Vec<Flat>, CatalogError> {
        let mut rows: Vec<Flat> = self
            .flats
            .lock()
            .expect("store mutex poisoned")
            .values()
            .filter(|flat| flat.residential_complex == complex)
            .cloned()
            .collect();
        rows.sort_by_key(|flat| flat.id);
        Ok(rows)
    }

    fn update_flat(&self, flat: Flat) -> Result<(), CatalogError> {
        let mut guard = self.flats.lock().expect("store mutex poisoned");
        if !guard.contains_key(&flat.id) {
            return Err(CatalogError::NotFound);
        }
        guard.insert(flat.id, flat);
        Ok(())
    }

    fn delete_flat(&self, id: FlatId) -> Result<(), CatalogError> {
        let bound = self
            .announcements
            .lock()
            .expect("store mutex poisoned")
            .values()
            .any(|record| record.announcement.flat == Some(id));
        if bound {
            return Err(CatalogError::Protected("announcements"));
        }
        self.flats
            .lock()
            .expect("store mutex poisoned")
            .remove(&id)
            .map(|_| ())
            .ok_or(CatalogError::NotFound)
    }

    fn insert_gallery(&self, gallery: Gallery) -> Result<(), CatalogError> {
        let mut guard = self.galleries.lock().expect("store mutex poisoned");
        if guard.contains_key(&gallery.id) {
            return Err(CatalogError::Conflict);
        }
        guard.insert(gallery.id, gallery);
        Ok(())
    }

    fn gallery(&self, id: GalleryId) -> Result<Option<Gallery>, CatalogError> {
        Ok(self
            .galleries
            .lock()
            .expect("store mutex poisoned")
            .get(&id)
            .cloned())
    }

    fn update_gallery(&self, gallery: Gallery) -> Result<(), CatalogError> {
        let mut guard = self.galleries.lock().expect("store mutex poisoned");
        if !guard.contains_key(&gallery.id) {
            return Err(CatalogError::NotFound);
        }
        guard.insert(gallery.id, gallery);
        Ok(())
    }

    fn gallery_of_photo(&self, photo: PhotoId) -> Result<Option<Gallery>, CatalogError> {
        Ok(self
            .galleries
            .lock()
            .expect("store mutex poisoned")
            .values()
            .find(|gallery| gallery.photos.iter().any(|item| item.id == photo))
            .cloned())
    }

    fn remove_photo(&self, photo: PhotoId) -> Result<(), CatalogError> {
        let mut guard = self.galleries.lock().expect("store mutex poisoned");
        for gallery in guard.values_mut() {
            if let Some(index) = gallery.photos.iter().position(|item| item.id == photo) {
                gallery.photos.remove(index);
                return Ok(());
            }
        }
        Err(CatalogError::NotFound)
    }
}

impl AnnouncementRepository for MemoryStore {
    fn insert(&self, record: AnnouncementRecord) -> Result<(), RepositoryError> {
        let mut guard = self.announcements.lock().expect("store mutex poisoned");
        if guard.contains_key(&record.announcement.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.announcement.id, record);
        Ok(())
    }

    fn update(&self, record: AnnouncementRecord) -> Result<(), RepositoryError> {
        let mut guard = self.announcements.lock().expect("store mutex poisoned");
        if !guard.contains_key(&record.announcement.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(record.announcement.id, record);
        Ok(())
    }

    fn fetch(&self, id: AnnouncementId) -> Result<Option<AnnouncementRecord>, RepositoryError> {
        Ok(self
            .announcements
            .lock()
            .expect("store mutex poisoned")
            .get(&id)
            .cloned())
    }

    fn list(&self) -> Result<Vec<AnnouncementRecord>, RepositoryError> {
        let mut all: Vec<AnnouncementRecord> = self
            .announcements
            .lock()
            .expect("store mutex poisoned")
            .values()
            .cloned()
            .collect();
        all.sort_by_key(|record| record.announcement.id);
        Ok(all)
    }

    fn delete(&self, id: AnnouncementId) -> Result<(), RepositoryError> {
        self.announcements
            .lock()
            .expect("store mutex poisoned")
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    fn flat_binding(&self, flat: FlatId) -> Result<Option<AnnouncementId>, RepositoryError> {
        Ok(self
            .announcements
            .lock()
            .expect("store mutex poisoned")
            .values()
            .find(|record| record.announcement.flat == Some(flat))
            .map(|record| record.announcement.id))
    }

    fn get_or_create_chessboard(&self, key: ChessBoardKey) -> Result<ChessBoard, RepositoryError> {
        let mut guard = self.chessboards.lock().expect("store mutex poisoned");
        let board = guard.entry(key).or_insert_with(|| ChessBoard {
            id: next_chessboard_id(),
            residential_complex: key.residential_complex,
            corps: key.corps,
            section: key.section,
            created_at: Utc::now(),
        });
        Ok(board.clone())
    }

    fn chessboards_by_complex(
        &self,
        complex: ComplexId,
    ) -> Result<Vec<ChessBoard>, RepositoryError> {
        let mut boards: Vec<ChessBoard> = self
            .chessboards
            .lock()
            .expect("store mutex poisoned")
            .values()
            .filter(|board| board.residential_complex == complex)
            .cloned()
            .collect();
        boards.sort_by_key(|board| board.id);
        Ok(boards)
    }
}

impl PromotionCatalog for MemoryStore {
    fn insert_type(&self, tariff: PromotionType) -> Result<(), RepositoryError> {
        let mut guard = self.promotion_types.lock().expect("store mutex poisoned");
        if guard.contains_key(&tariff.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(tariff.id, tariff);
        Ok(())
    }

    fn update_type(&self, tariff: PromotionType) -> Result<(), RepositoryError> {
        let mut guard = self.promotion_types.lock().expect("store mutex poisoned");
        if !guard.contains_key(&tariff.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(tariff.id, tariff);
        Ok(())
    }

    fn promotion_type(
        &self,
        id: PromotionTypeId,
    ) -> Result<Option<PromotionType>, RepositoryError> {
        Ok(self
            .promotion_types
            .lock()
            .expect("store mutex poisoned")
            .get(&id)
            .cloned())
    }

    fn promotion_types(&self) -> Result<Vec<PromotionType>, RepositoryError> {
        Ok(self
            .promotion_types
            .lock()
            .expect("store mutex poisoned")
            .values()
            .cloned()
            .collect())
    }
}

impl FavoriteRepository for MemoryStore {
    fn insert(&self, favorite: Favorite) -> Result<(), RepositoryError> {
        let mut guard = self.favorites.lock().expect("store mutex poisoned");
        let duplicate = guard
            .values()
            .any(|row| row.user == favorite.user && row.target == favorite.target);
        if duplicate {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(favorite.id, favorite);
        Ok(())
    }

    fn fetch(&self, id: FavoriteId) -> Result<Option<Favorite>, RepositoryError> {
        Ok(self
            .favorites
            .lock()
            .expect("store mutex poisoned")
            .get(&id)
            .cloned())
    }

    fn list_by_user(&self, user: UserId) -> Result<Vec<Favorite>, RepositoryError> {
        let mut rows: Vec<Favorite> = self
            .favorites
            .lock()
            .expect("store mutex poisoned")
            .values()
            .filter(|favorite| favorite.user == user)
            .cloned()
            .collect();
        rows.sort_by_key(|favorite| favorite.id);
        Ok(rows)
    }

    fn delete(&self, id: FavoriteId) -> Result<(), RepositoryError> {
        self.favorites
            .lock()
            .expect("store mutex poisoned")
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

impl MessageRepository for MemoryStore {
    fn insert(&self, message: Message) -> Result<(), RepositoryError> {
        self.messages
            .lock()
            .expect("store mutex poisoned")
            .push(message);
        Ok(())
    }

    fn conversation(&self, a: UserId, b: UserId) -> Result<Vec<Message>, RepositoryError> {
        Ok(self
            .messages
            .lock()
            .expect("store mutex poisoned")
            .iter()
            .filter(|message| {
                (message.sender == a && message.recipient == b)
                    || (message.sender == b && message.recipient == a)
            })
            .cloned()
            .collect())
    }
}

impl SubscriptionRepository for MemoryStore {
    fn insert(&self, subscription: UserSubscription) -> Result<(), RepositoryError> {
        let mut guard = self.subscriptions.lock().expect("store mutex poisoned");
        let duplicate = guard.values().any(|row| row.user == subscription.user);
        if duplicate || guard.contains_key(&subscription.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(subscription.id, subscription);
        Ok(())
    }

    fn update(&self, subscription: UserSubscription) -> Result<(), RepositoryError> {
        let mut guard = self.subscriptions.lock().expect("store mutex poisoned");
        if !guard.contains_key(&subscription.id) {
            return Err(RepositoryError::NotFound);
        }
        guard.insert(subscription.id, subscription);
        Ok(())
    }

    fn by_user(&self, user: UserId) -> Result<Option<UserSubscription>, RepositoryError> {
        Ok(self
            .subscriptions
            .lock()
            .expect("store mutex poisoned")
            .values()
            .find(|subscription| subscription.user == user)
            .cloned())
    }

    fn list(&self) -> Result<Vec<UserSubscription>, RepositoryError> {
        let mut all: Vec<UserSubscription> = self
            .subscriptions
            .lock()
            .expect("store mutex poisoned")
            .values()
            .cloned()
            .collect();
        all.sort_by_key(|subscription| subscription.id);
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marketplace::catalog::domain::{
        next_complex_id, next_flat_id, FlatCondition, HouseClass, HouseStatus, TerritoryType,
    };
    use crate::marketplace::catalog::gallery::next_gallery_id;

    fn complex(owner: UserId) -> ResidentialComplex {
        ResidentialComplex {
            id: next_complex_id(),
            owner,
            name: "Riverside".into(),
            address: "Quay 1".into(),
            description: String::new(),
            house_status: HouseStatus::Flats,
            house_class: HouseClass::Common,
            territory_type: TerritoryType::Opened,
            price_for_meter: 1200.0,
            min_price: 40_000,
            main_photo: String::new(),
            gallery: next_gallery_id(),
        }
    }

    fn flat(complex: ComplexId, corps: CorpsId, section: SectionId, floor: FloorId) -> Flat {
        Flat {
            id: next_flat_id(),
            residential_complex: complex,
            corps,
            section,
            floor,
            district: "north".into(),
            micro_district: "center".into(),
            room_amount: 2,
            scheme: String::new(),
            square: 55,
            price: 60_000,
            condition: FlatCondition::LivingCondition,
            gallery: next_gallery_id(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn complex_with_flats_cannot_be_deleted() {
        let store = MemoryStore::new();
        let (builder, _) = store.add_user("Bea", "Stone", "bea@estate.test", Role::Builder);
        let record = complex(builder.id);
        let complex_id = record.id;
        store.insert_complex(record).unwrap();
        store
            .insert_flat(flat(
                complex_id,
                CorpsId(1),
                SectionId(1),
                FloorId(1),
            ))
            .unwrap();
        assert!(matches!(
            store.delete_complex(complex_id),
            Err(CatalogError::Protected("flats"))
        ));
    }

    #[test]
    fn chessboard_creation_is_idempotent() {
        let store = MemoryStore::new();
        let key = ChessBoardKey {
            residential_complex: ComplexId(7),
            corps: CorpsId(1),
            section: SectionId(2),
        };
        let first = store.get_or_create_chessboard(key).unwrap();
        let second = store.get_or_create_chessboard(key).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.chessboards_by_complex(ComplexId(7)).unwrap().len(), 1);
    }

    #[test]
    fn duplicate_favorite_is_a_conflict() {
        let store = MemoryStore::new();
        let favorite = Favorite {
            id: FavoriteId(1),
            user: UserId(1),
            target: crate::marketplace::favorites::FavoriteTarget::Announcement(AnnouncementId(9)),
        };
        let again = Favorite {
            id: FavoriteId(2),
            ..favorite.clone()
        };
        FavoriteRepository::insert(&store, favorite).unwrap();
        assert!(matches!(
            FavoriteRepository::insert(&store, again),
            Err(RepositoryError::Conflict)
        ));
    }
}
