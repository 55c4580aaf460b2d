use std::{
    collections::HashMap,
    convert::TryFrom,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::{
    error::TimezoneError,
    parser,
    timezone::{Timezone, VTimeZone},
};

/// The aliases every registry starts out with.
const UTC_ALIASES: [&str; 3] = ["Z", "UTC", "GMT"];

/// Timezones addressable by TZID.
///
/// A registry is an explicit value: callers build one (usually from the
/// VTIMEZONEs of a calendar) and hand a reference to whatever needs to
/// resolve named zones. Lookups are safe from multiple threads.
#[derive(Debug)]
pub struct TimezoneRegistry {
    zones: RwLock<HashMap<String, Arc<Timezone>>>,
}

impl Default for TimezoneRegistry {
    fn default() -> Self {
        TimezoneRegistry::new()
    }
}

impl TimezoneRegistry {
    /// A registry holding only the UTC aliases.
    pub fn new() -> Self {
        TimezoneRegistry {
            zones: RwLock::new(builtin_zones()),
        }
    }

    pub fn has(&self, tzid: &str) -> bool {
        self.read().contains_key(tzid)
    }

    pub fn get(&self, tzid: &str) -> Option<Arc<Timezone>> {
        self.read().get(tzid).cloned()
    }

    pub fn resolve(&self, tzid: &str) -> Result<Arc<Timezone>, TimezoneError> {
        self.get(tzid)
            .ok_or_else(|| TimezoneError::NotFound(tzid.to_string()))
    }

    /// Adds a zone under its own TZID, replacing any zone already there.
    pub fn register(&self, timezone: Timezone) -> Arc<Timezone> {
        let tzid = timezone.tzid().to_string();
        self.register_as(tzid, timezone)
    }

    /// Adds a zone under an explicit name.
    pub fn register_as(&self, tzid: impl Into<String>, timezone: Timezone) -> Arc<Timezone> {
        let tzid = tzid.into();
        let timezone = Arc::new(timezone);

        if self
            .write()
            .insert(tzid.clone(), timezone.clone())
            .is_some()
        {
            tracing::debug!(%tzid, "replaced registered timezone");
        }

        timezone
    }

    /// Registers a parsed VTIMEZONE component.
    pub fn register_component(
        &self,
        component: parser::Component,
    ) -> Result<Arc<Timezone>, TimezoneError> {
        if !component.name.eq_ignore_ascii_case("VTIMEZONE") {
            return Err(TimezoneError::NotATimezone(component.name));
        }

        let vtimezone = VTimeZone::try_from(component)
            .map_err(|err| TimezoneError::InvalidDefinition(err.to_string()))?;

        Ok(self.register(Timezone::Defined(vtimezone)))
    }

    pub fn remove(&self, tzid: &str) -> Option<Arc<Timezone>> {
        self.write().remove(tzid)
    }

    /// Drops everything except the UTC aliases.
    pub fn reset(&self) {
        *self.write() = builtin_zones();
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    pub fn tzids(&self) -> Vec<String> {
        let mut tzids: Vec<_> = self.read().keys().cloned().collect();
        tzids.sort();
        tzids
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Arc<Timezone>>> {
        match self.zones.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Arc<Timezone>>> {
        match self.zones.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn builtin_zones() -> HashMap<String, Arc<Timezone>> {
    let utc = Arc::new(Timezone::Utc);
    UTC_ALIASES
        .iter()
        .map(|alias| (alias.to_string(), utc.clone()))
        .collect()
}
