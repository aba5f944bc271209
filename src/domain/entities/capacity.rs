use serde::Serialize;

/// Which level of the catalog produced an event's seat limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CapacitySource {
    Event,
    Club,
}

impl CapacitySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapacitySource::Event => "event",
            CapacitySource::Club => "club",
        }
    }
}

/// A finite seat limit together with the level it was resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EffectiveCapacity {
    pub limit: i32,
    pub source: CapacitySource,
}

impl EffectiveCapacity {
    /// True when `active` members already occupy every seat.
    pub fn is_full(&self, active: i64) -> bool {
        active >= i64::from(self.limit)
    }
}

/// Resolves the seat limit actually enforced for an event.
///
/// The event-level value wins when it is a non-negative integer, otherwise the
/// club default applies under the same rule. `None` means unlimited.
pub fn resolve_effective_capacity(
    event_capacity: Option<i32>,
    club_capacity: Option<i32>,
) -> Option<EffectiveCapacity> {
    if let Some(limit) = event_capacity.filter(|c| *c >= 0) {
        return Some(EffectiveCapacity {
            limit,
            source: CapacitySource::Event,
        });
    }
    club_capacity
        .filter(|c| *c >= 0)
        .map(|limit| EffectiveCapacity {
            limit,
            source: CapacitySource::Club,
        })
}

/// Resolves the authoritative ticket price (minor units): event price first,
/// then the club default. Negative prices are treated as unset.
pub fn resolve_price(event_price: Option<i64>, club_price: Option<i64>) -> Option<i64> {
    event_price
        .filter(|p| *p >= 0)
        .or_else(|| club_price.filter(|p| *p >= 0))
}
