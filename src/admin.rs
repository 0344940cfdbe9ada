//! Admin-side reservation management: the list filter and pager, status
//! transitions, edits, and bulk deletion.

use std::sync::Arc;

use tracing::info;
use ulid::Ulid;

use crate::date;
use crate::engine::BookingError;
use crate::limits::ADMIN_PAGE_SIZE;
use crate::model::*;
use crate::store::BookingStore;

/// Status facet of the admin list filter. `Pending` matches
/// `pending_payment` and the legacy bare `pending` alike (both deserialize
/// into [`ReservationStatus::PendingPayment`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusQuery {
    Pending,
    Confirmed,
    Rejected,
}

impl StatusQuery {
    fn matches(&self, status: ReservationStatus) -> bool {
        match self {
            StatusQuery::Pending => status == ReservationStatus::PendingPayment,
            StatusQuery::Confirmed => status == ReservationStatus::Confirmed,
            StatusQuery::Rejected => status == ReservationStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReservationFilter {
    /// Case-insensitive substring match on customer name or game.
    pub text: String,
    /// Inclusive date-range bounds, `YYYY-MM-DD`.
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub status: Option<StatusQuery>,
}

pub fn filter_reservations(
    reservations: &[Reservation],
    filter: &ReservationFilter,
) -> Vec<Reservation> {
    let needle = filter.text.to_lowercase();
    reservations
        .iter()
        .filter(|r| {
            if !needle.is_empty()
                && !r.user_name.to_lowercase().contains(&needle)
                && !r.game.to_lowercase().contains(&needle)
            {
                return false;
            }
            // canonical date strings order lexicographically by calendar day
            let day = date::normalize(&r.date);
            if let Some(from) = &filter.date_from
                && day < *from
            {
                return false;
            }
            if let Some(to) = &filter.date_to
                && day > *to
            {
                return false;
            }
            if let Some(status) = filter.status
                && !status.matches(r.status)
            {
                return false;
            }
            true
        })
        .cloned()
        .collect()
}

/// One page of the filtered list. `page` is 1-based and already clamped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationPage {
    pub items: Vec<Reservation>,
    pub page: usize,
    pub total_pages: usize,
    pub total_matching: usize,
}

pub fn paginate(matching: Vec<Reservation>, page: usize, page_size: usize) -> ReservationPage {
    let total_matching = matching.len();
    let total_pages = total_matching.div_ceil(page_size).max(1);
    let page = page.clamp(1, total_pages);
    let start = (page - 1) * page_size;
    let items = matching
        .into_iter()
        .skip(start)
        .take(page_size)
        .collect();
    ReservationPage {
        items,
        page,
        total_pages,
        total_matching,
    }
}

/// Admin operations over the store. Holds no mirror of its own — every
/// call reads or writes through, and the admin view's subscriptions keep
/// its rendering current like any other view.
pub struct AdminPanel {
    store: Arc<dyn BookingStore>,
}

impl AdminPanel {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self { store }
    }

    pub async fn list_reservations(
        &self,
        filter: &ReservationFilter,
        page: usize,
    ) -> Result<ReservationPage, BookingError> {
        let all = self.store.reservations().await?;
        Ok(paginate(
            filter_reservations(&all, filter),
            page,
            ADMIN_PAGE_SIZE,
        ))
    }

    /// Fetch one reservation, e.g. to prefill the edit form.
    pub async fn reservation(&self, id: Ulid) -> Result<Reservation, BookingError> {
        self.store
            .reservation(id)
            .await?
            .ok_or(BookingError::NotFound(id))
    }

    pub async fn confirm_reservation(&self, id: Ulid) -> Result<(), BookingError> {
        info!("confirming reservation {id}");
        self.store
            .update_reservation(id, ReservationUpdate::status(ReservationStatus::Confirmed))
            .await
    }

    /// Rejecting frees the table: the reservation stops counting toward
    /// occupancy. Rejecting twice is a no-op for occupancy.
    pub async fn reject_reservation(&self, id: Ulid) -> Result<(), BookingError> {
        info!("rejecting reservation {id}");
        self.store
            .update_reservation(id, ReservationUpdate::status(ReservationStatus::Rejected))
            .await
    }

    pub async fn edit_reservation(
        &self,
        id: Ulid,
        updates: ReservationUpdate,
    ) -> Result<(), BookingError> {
        self.store.update_reservation(id, updates).await
    }

    pub async fn delete_reservation(&self, id: Ulid) -> Result<(), BookingError> {
        self.store.delete_reservation(id).await
    }

    /// Delete a selection one at a time; the first failure aborts the rest.
    pub async fn delete_reservations(&self, ids: &[Ulid]) -> Result<usize, BookingError> {
        let mut deleted = 0;
        for &id in ids {
            self.store.delete_reservation(id).await?;
            deleted += 1;
        }
        info!("bulk-deleted {deleted} reservations");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reservation(name: &str, game: &str, day: &str, status: ReservationStatus) -> Reservation {
        Reservation {
            id: Ulid::new(),
            user_id: "u1".into(),
            user_name: name.into(),
            user_email: "u@example.com".into(),
            phone: "1155551234".into(),
            date: day.into(),
            time: "17:00-19:00".into(),
            people: 2,
            game: game.into(),
            price_per_person: 5000,
            total: 10000,
            status,
            created_at: "2024-06-01T12:00:00+00:00".into(),
        }
    }

    #[test]
    fn text_filter_matches_name_or_game() {
        let list = vec![
            reservation("Ana", "Catan", "2024-06-01", ReservationStatus::Confirmed),
            reservation("Bruno", "Azul", "2024-06-01", ReservationStatus::Confirmed),
        ];
        let filter = ReservationFilter {
            text: "catan".into(),
            ..Default::default()
        };
        let out = filter_reservations(&list, &filter);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].user_name, "Ana");

        let filter = ReservationFilter {
            text: "BRU".into(),
            ..Default::default()
        };
        assert_eq!(filter_reservations(&list, &filter).len(), 1);
    }

    #[test]
    fn date_range_bounds_are_inclusive() {
        let list = vec![
            reservation("a", "g", "2024-06-01", ReservationStatus::Confirmed),
            reservation("b", "g", "2024-06-15", ReservationStatus::Confirmed),
            reservation("c", "g", "2024-07-01", ReservationStatus::Confirmed),
        ];
        let filter = ReservationFilter {
            date_from: Some("2024-06-01".into()),
            date_to: Some("2024-06-15".into()),
            ..Default::default()
        };
        let out = filter_reservations(&list, &filter);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn legacy_timestamp_dates_filter_correctly() {
        let list = vec![reservation(
            "a",
            "g",
            "2024-06-01T00:00:00-03:00",
            ReservationStatus::Confirmed,
        )];
        let filter = ReservationFilter {
            date_from: Some("2024-06-01".into()),
            date_to: Some("2024-06-01".into()),
            ..Default::default()
        };
        assert_eq!(filter_reservations(&list, &filter).len(), 1);
    }

    #[test]
    fn pending_query_matches_legacy_pending() {
        let legacy: ReservationStatus = serde_json::from_str("\"pending\"").unwrap();
        let list = vec![
            reservation("a", "g", "2024-06-01", legacy),
            reservation("b", "g", "2024-06-01", ReservationStatus::PendingPayment),
            reservation("c", "g", "2024-06-01", ReservationStatus::Rejected),
        ];
        let filter = ReservationFilter {
            status: Some(StatusQuery::Pending),
            ..Default::default()
        };
        assert_eq!(filter_reservations(&list, &filter).len(), 2);
    }

    #[test]
    fn pagination_clamps_out_of_range_pages() {
        let list: Vec<Reservation> = (0..25)
            .map(|i| {
                reservation(
                    &format!("user{i}"),
                    "g",
                    "2024-06-01",
                    ReservationStatus::Confirmed,
                )
            })
            .collect();

        let page = paginate(list.clone(), 99, 10);
        assert_eq!(page.page, 3);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items.len(), 5);

        let page = paginate(list.clone(), 0, 10);
        assert_eq!(page.page, 1);
        assert_eq!(page.items.len(), 10);

        let page = paginate(Vec::new(), 5, 10);
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 1);
        assert!(page.items.is_empty());
    }
}
