//! Household administration: parents, members, rooms, and the chore
//! catalogue.
//!
//! Parent PINs are stored as a salted blake3 digest in "hash:salt" hex form.
//! The PIN is a convenience gate for a wall-mounted family dashboard, not a
//! security boundary against a determined attacker with disk access.

use chrono::{NaiveDate, Utc};
use rand::RngCore;
use tracing::info;

use super::errors::ChoreError;
use super::models::{Chore, ChoreFrequency, HouseholdMember, Parent, Room};
use crate::storage::{ChoreRepository, MemberRepository, ParentRepository, RoomRepository};

#[derive(Clone)]
pub struct HouseholdService {
    parents: ParentRepository,
    members: MemberRepository,
    rooms: RoomRepository,
    chores: ChoreRepository,
}

impl HouseholdService {
    pub fn new(
        parents: ParentRepository,
        members: MemberRepository,
        rooms: RoomRepository,
        chores: ChoreRepository,
    ) -> Self {
        Self {
            parents,
            members,
            rooms,
            chores,
        }
    }

    pub async fn create_parent(&self, name: &str, pin: &str) -> Result<Parent, ChoreError> {
        if !pin_is_valid(pin) {
            return Err(ChoreError::InvalidPin);
        }
        if self.parents.find_by_name(name).await?.is_some() {
            return Err(ChoreError::ParentNameTaken {
                name: name.to_string(),
            });
        }

        let parent = self.parents.create(name, &hash_pin(pin), Utc::now()).await?;
        info!("created parent '{}' (id {})", parent.name, parent.id);
        Ok(parent)
    }

    /// Authenticates a parent by PIN. Wrong PIN and unknown parent are
    /// reported distinctly; an inactive parent cannot authenticate.
    pub async fn verify_parent_pin(
        &self,
        parent_id: i64,
        pin: &str,
    ) -> Result<Parent, ChoreError> {
        let parent = self
            .parents
            .find_by_id(parent_id)
            .await?
            .ok_or(ChoreError::ParentNotFound { parent_id })?;
        if !parent.is_active || !verify_pin(pin, &parent.pin_hash) {
            return Err(ChoreError::InvalidPin);
        }
        Ok(parent)
    }

    pub async fn create_member(
        &self,
        name: &str,
        date_of_birth: NaiveDate,
        is_parent: bool,
        parent_id: i64,
    ) -> Result<HouseholdMember, ChoreError> {
        self.require_parent(parent_id).await?;
        let member = self
            .members
            .create(name, date_of_birth, is_parent, parent_id, Utc::now())
            .await?;
        info!("created household member '{}' (id {})", member.name, member.id);
        Ok(member)
    }

    pub async fn create_room(
        &self,
        name: &str,
        description: Option<&str>,
        parent_id: i64,
    ) -> Result<Room, ChoreError> {
        self.require_parent(parent_id).await?;
        let room = self
            .rooms
            .create(name, description, parent_id, Utc::now())
            .await?;
        info!("created room '{}' (id {})", room.name, room.id);
        Ok(room)
    }

    /// Adds a chore to a room the parent owns. Points must be positive; the
    /// cap logic assumes every chore is worth at least one point.
    pub async fn create_chore(
        &self,
        name: &str,
        description: Option<&str>,
        points: i64,
        frequency: ChoreFrequency,
        room_id: i64,
        parent_id: i64,
    ) -> Result<Chore, ChoreError> {
        if points <= 0 {
            return Err(ChoreError::InvalidChorePoints { points });
        }
        self.require_parent(parent_id).await?;

        let room = self
            .rooms
            .find_by_id(room_id)
            .await?
            .filter(|room| room.is_active)
            .ok_or(ChoreError::RoomNotFound { room_id })?;
        if room.parent_id != parent_id {
            return Err(ChoreError::ParentAccessDenied);
        }

        let chore = self
            .chores
            .create(name, description, points, frequency, room_id, parent_id, Utc::now())
            .await?;
        info!(
            "created chore '{}' ({} points, {}) in room '{}'",
            chore.name,
            chore.points,
            chore.frequency.as_str(),
            room.name
        );
        Ok(chore)
    }

    /// Disables a chore. Existing completion records keep their history; new
    /// attempts fail with the disabled error.
    pub async fn deactivate_chore(&self, chore_id: i64, parent_id: i64) -> Result<(), ChoreError> {
        let chore = self
            .chores
            .find_by_id(chore_id)
            .await?
            .ok_or(ChoreError::ChoreNotFound { chore_id })?;
        if chore.parent_id != parent_id {
            return Err(ChoreError::ParentAccessDenied);
        }
        self.chores.set_active(chore_id, false, Utc::now()).await?;
        info!("deactivated chore '{}' (id {})", chore.name, chore.id);
        Ok(())
    }

    /// Disables a room. Its chores stay individually active or inactive; a
    /// disabled room just stops accepting new chores.
    pub async fn deactivate_room(&self, room_id: i64, parent_id: i64) -> Result<(), ChoreError> {
        let room = self
            .rooms
            .find_by_id(room_id)
            .await?
            .ok_or(ChoreError::RoomNotFound { room_id })?;
        if room.parent_id != parent_id {
            return Err(ChoreError::ParentAccessDenied);
        }
        self.rooms.set_active(room_id, false, Utc::now()).await?;
        info!("deactivated room '{}' (id {})", room.name, room.id);
        Ok(())
    }

    pub async fn list_members(&self) -> Result<Vec<HouseholdMember>, ChoreError> {
        Ok(self.members.list_active().await?)
    }

    pub async fn list_rooms(&self) -> Result<Vec<Room>, ChoreError> {
        Ok(self.rooms.list_active().await?)
    }

    pub async fn list_chores(&self) -> Result<Vec<Chore>, ChoreError> {
        Ok(self.chores.list_active().await?)
    }

    async fn require_parent(&self, parent_id: i64) -> Result<Parent, ChoreError> {
        self.parents
            .find_by_id(parent_id)
            .await?
            .filter(|parent| parent.is_active)
            .ok_or(ChoreError::ParentNotFound { parent_id })
    }
}

fn pin_is_valid(pin: &str) -> bool {
    (4..=6).contains(&pin.len()) && pin.bytes().all(|b| b.is_ascii_digit())
}

fn hash_pin(pin: &str) -> String {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    let mut hasher = blake3::Hasher::new();
    hasher.update(&salt);
    hasher.update(pin.as_bytes());
    format!("{}:{}", hasher.finalize().to_hex(), hex::encode(salt))
}

fn verify_pin(pin: &str, stored: &str) -> bool {
    let Some((hash_hex, salt_hex)) = stored.split_once(':') else {
        return false;
    };
    let Ok(salt) = hex::decode(salt_hex) else {
        return false;
    };
    let mut hasher = blake3::Hasher::new();
    hasher.update(&salt);
    hasher.update(pin.as_bytes());
    hasher.finalize().to_hex().as_str() == hash_hex
}
