use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

pub type Id = String;

/// Locale code -> display text, e.g. {"en_US": "Color", "ar_EG": "اللون"}
pub type Labels = BTreeMap<String, String>;

pub fn generate_id() -> Id {
    Uuid::new_v4().to_string()
}

/// Default timestamp for documents persisted before audit fields existed
pub(crate) fn default_timestamp() -> DateTime<Utc> {
    DateTime::from_timestamp(0, 0).unwrap_or_else(Utc::now)
}

pub(crate) fn default_true() -> bool {
    true
}

/// Channels and locales a value set is checked against.
///
/// Scopable attributes need a value per channel, localizable attributes a
/// value per locale. Both lists are tenant configuration and are always
/// supplied by the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelLocales {
    pub channels: Vec<String>,
    pub locales: Vec<String>,
}

impl ChannelLocales {
    pub fn new<C, L>(channels: C, locales: L) -> Self
    where
        C: IntoIterator,
        C::Item: Into<String>,
        L: IntoIterator,
        L::Item: Into<String>,
    {
        Self {
            channels: channels.into_iter().map(Into::into).collect(),
            locales: locales.into_iter().map(Into::into).collect(),
        }
    }

    pub fn has_channel(&self, channel: &str) -> bool {
        self.channels.iter().any(|c| c == channel)
    }

    pub fn has_locale(&self, locale: &str) -> bool {
        self.locales.iter().any(|l| l == locale)
    }
}

/// Generic paginated listing used by the list endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub size: usize,
    pub pages: usize,
}

impl<T> Page<T> {
    /// Slice `all` into the 1-based page `page` of `size` items
    pub fn paginate(all: Vec<T>, page: usize, size: usize) -> Self {
        let page = page.max(1);
        let size = size.max(1);
        let total = all.len();
        let pages = total.div_ceil(size);
        let items = all.into_iter().skip((page - 1) * size).take(size).collect();
        Self {
            items,
            total,
            page,
            size,
            pages,
        }
    }
}
