//! Hard limits and venue defaults. Everything tunable lives here.

use crate::model::Money;

/// Tables the venue can seat per (date, slot) pair.
pub const TABLE_COUNT: u32 = 4;

pub const MIN_PEOPLE: u8 = 1;
pub const MAX_PEOPLE: u8 = 6;

/// Price per person used until an admin sets one.
pub const DEFAULT_PRICE: Money = 5000;

/// Payment alias shown until an admin sets one.
pub const DEFAULT_PAYMENT_ALIAS: &str = "ALIAS.DE.EJEMPLO";

pub const MAX_NAME_LEN: usize = 128;
pub const MAX_GAME_LEN: usize = 128;
pub const MAX_PHONE_LEN: usize = 32;
pub const MAX_LABEL_LEN: usize = 64;
pub const MAX_ALIAS_LEN: usize = 64;
pub const MAX_NEWS_TITLE_LEN: usize = 128;
pub const MAX_NEWS_BODY_LEN: usize = 4096;

/// Reservations shown per admin list page.
pub const ADMIN_PAGE_SIZE: usize = 10;

/// Capacity of every snapshot broadcast channel.
pub const CHANNEL_CAPACITY: usize = 64;
