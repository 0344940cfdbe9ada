//! The customer booking flow, headless: the same selection, validation,
//! and confirm steps the booking page walks through, minus the DOM.

use tracing::{info, warn};

use crate::engine::{self, BookingError};
use crate::limits::DEFAULT_PAYMENT_ALIAS;
use crate::model::*;
use crate::observability::RESERVATIONS_CREATED_TOTAL;
use crate::store::BookingStore;
use crate::sync::ViewSession;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameChoice {
    /// The party picks a game off the shelf once seated.
    DecideAtVenue,
    Named(String),
}

impl GameChoice {
    /// The game string stored on the reservation.
    pub fn as_game_name(&self) -> &str {
        match self {
            GameChoice::DecideAtVenue => DECIDE_AT_VENUE,
            GameChoice::Named(name) => name,
        }
    }
}

/// What the booking summary shows before the customer confirms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingSummary {
    pub date: String,
    pub time: String,
    pub people: u8,
    pub game: String,
    pub total: Money,
    pub payment_alias: String,
}

/// Digits with optional leading `+`, spaces and dashes allowed.
fn is_valid_phone(phone: &str) -> bool {
    let rest = phone.strip_prefix('+').unwrap_or(phone);
    !rest.is_empty()
        && rest
            .chars()
            .all(|c| c.is_ascii_digit() || c == ' ' || c == '-')
}

/// One customer's in-progress booking over a live [`ViewSession`].
pub struct BookingFlow {
    session: ViewSession,
    user: UserProfile,
    selected_slot: Option<String>,
    game: GameChoice,
    phone: String,
}

impl BookingFlow {
    pub fn new(session: ViewSession, user: UserProfile) -> Self {
        Self {
            session,
            user,
            selected_slot: None,
            game: GameChoice::DecideAtVenue,
            phone: String::new(),
        }
    }

    pub fn session(&self) -> &ViewSession {
        &self.session
    }

    // ── Selection ────────────────────────────────────────────

    /// Pick a date; any previously picked slot is dropped with it.
    pub async fn select_date(
        &mut self,
        day: &str,
    ) -> Result<Vec<SlotAvailability>, BookingError> {
        let slots = self.session.select_date(day).await?;
        self.selected_slot = None;
        Ok(slots)
    }

    /// Pick a time slot for the selected date. Only an active catalog slot
    /// with room left (per the cached mirror) is selectable.
    pub async fn select_slot(&mut self, label: &str) -> Result<(), BookingError> {
        let day = self
            .session
            .selected_date()
            .await
            .ok_or(BookingError::Validation("no date selected"))?;
        let slots = self.session.availability_for(&day).await;
        let entry = slots
            .iter()
            .find(|s| s.slot.label == label)
            .ok_or(BookingError::Validation("unknown time slot"))?;
        if !entry.availability.available {
            return Err(BookingError::Validation("no tables left for this slot"));
        }
        self.selected_slot = Some(label.to_string());
        Ok(())
    }

    pub fn selected_slot(&self) -> Option<&str> {
        self.selected_slot.as_deref()
    }

    pub async fn set_people(&self, people: u8) -> u8 {
        self.session.set_people(people).await
    }

    pub fn set_game(&mut self, game: GameChoice) {
        self.game = game;
    }

    pub fn set_phone(&mut self, phone: &str) {
        self.phone = phone.trim().to_string();
    }

    // ── Validation ───────────────────────────────────────────

    /// Everything the form checks before any store call is made.
    pub async fn validate(&self) -> Result<(), BookingError> {
        if self.session.selected_date().await.is_none() {
            return Err(BookingError::Validation("no date selected"));
        }
        if self.selected_slot.is_none() {
            return Err(BookingError::Validation("no time slot selected"));
        }
        if let GameChoice::Named(name) = &self.game
            && name.trim().is_empty()
        {
            return Err(BookingError::Validation("game name is empty"));
        }
        if !is_valid_phone(&self.phone) {
            return Err(BookingError::Validation("bad phone number"));
        }
        Ok(())
    }

    // ── Summary and confirm ──────────────────────────────────

    /// Validate, re-check the slot against the store (targeted query,
    /// fail-closed), and open the booking summary.
    pub async fn open_summary(&self) -> Result<BookingSummary, BookingError> {
        self.validate().await?;
        let day = self
            .session
            .selected_date()
            .await
            .ok_or(BookingError::Validation("no date selected"))?;
        let slot = self
            .selected_slot
            .clone()
            .ok_or(BookingError::Validation("no time slot selected"))?;

        let availability =
            engine::check_slot_availability(self.session.store().as_ref(), &day, &slot).await;
        if !availability.available {
            return Err(BookingError::Validation("no tables left for this slot"));
        }

        // the alias is display-only; an unreadable store falls back to the
        // placeholder instead of blocking the summary
        let payment_alias = match self.session.store().payment_alias().await {
            Ok(alias) => alias,
            Err(e) => {
                warn!("could not read payment alias: {e}");
                DEFAULT_PAYMENT_ALIAS.to_string()
            }
        };

        self.session.open_summary().await;
        Ok(BookingSummary {
            date: day,
            time: slot,
            people: self.session.people().await,
            game: self.game.as_game_name().to_string(),
            total: self.session.summary_total().await,
            payment_alias,
        })
    }

    pub async fn close_summary(&self) {
        self.session.close_summary().await;
    }

    /// Write the reservation with the price snapshotted at this moment.
    ///
    /// Occupancy is not re-read at write time; another customer confirming
    /// in the same instant can push a slot past the cap, and the admin
    /// resolves it by rejecting one of the requests.
    pub async fn confirm(&self) -> Result<Reservation, BookingError> {
        self.validate().await?;
        let day = self
            .session
            .selected_date()
            .await
            .ok_or(BookingError::Validation("no date selected"))?;
        let slot = self
            .selected_slot
            .clone()
            .ok_or(BookingError::Validation("no time slot selected"))?;

        let price = self.session.price().await;
        let people = self.session.people().await;
        let draft = ReservationDraft {
            user_id: self.user.user_id.clone(),
            user_name: self.user.name.clone(),
            user_email: self.user.email.clone(),
            phone: self.phone.clone(),
            date: day,
            time: slot,
            people,
            game: self.game.as_game_name().to_string(),
            price_per_person: price,
            total: price * people as Money,
        };

        let reservation = self.session.store().add_reservation(draft).await?;
        metrics::counter!(RESERVATIONS_CREATED_TOTAL).increment(1);
        info!(
            "reservation {} confirmed by {} for {} {}",
            reservation.id, self.user.user_id, reservation.date, reservation.time
        );
        self.session.close_summary().await;
        Ok(reservation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_validation() {
        assert!(is_valid_phone("+54 11 5555-1234"));
        assert!(is_valid_phone("1155551234"));
        assert!(!is_valid_phone(""));
        assert!(!is_valid_phone("+"));
        assert!(!is_valid_phone("call me"));
        assert!(!is_valid_phone("555@1234"));
    }

    #[test]
    fn game_choice_names() {
        assert_eq!(GameChoice::DecideAtVenue.as_game_name(), DECIDE_AT_VENUE);
        assert_eq!(
            GameChoice::Named("Catan".into()).as_game_name(),
            "Catan"
        );
    }
}
