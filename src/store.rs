//! Saved locations and groups, plus the JSON blobs that persist them.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::event::{Coordinate, GroupId, LocationId};

/// A bookmarked place. Coordinates are validated when the store is
/// rebuilt from persistence, not on every mutation, so a freshly
/// patched record may briefly hold an out-of-range pair until reload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub id: LocationId,
    pub name: String,
    pub desc: Option<String>,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub group_id: Option<GroupId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    #[serde(default)]
    pub collapsed: bool,
}

/// Input for a brand new location. The store assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationDraft {
    pub name: String,
    pub desc: Option<String>,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub group_id: Option<GroupId>,
}

/// Merge patch for a location. An absent field leaves the current value,
/// an explicit `null` on `desc` or `group_id` clears it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "double_option"
    )]
    pub desc: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hidden: Option<bool>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "double_option"
    )]
    pub group_id: Option<Option<GroupId>>,
}

// Keeps `"desc": null` distinguishable from an absent `desc`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationStore {
    locations: Vec<Location>,
    groups: Vec<Group>,
}

impl LocationStore {
    #[must_use]
    pub fn locations(&self) -> &[Location] {
        &self.locations
    }

    #[must_use]
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    #[must_use]
    pub fn location(&self, id: &LocationId) -> Option<&Location> {
        self.locations.iter().find(|l| l.id == *id)
    }

    #[must_use]
    pub fn group(&self, id: &GroupId) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == *id)
    }

    /// Rebuilds the store from persisted collections, dropping any
    /// location whose coordinates no longer pass validation.
    #[must_use]
    pub fn from_persisted(locations: Vec<Location>, groups: Vec<Group>) -> Self {
        let total = locations.len();
        let locations: Vec<Location> = locations
            .into_iter()
            .filter(|l| Coordinate::new(l.lat, l.lng).is_ok())
            .collect();

        let dropped = total - locations.len();
        if dropped > 0 {
            warn!(dropped, "dropped persisted locations with invalid coordinates");
        }

        Self { locations, groups }
    }

    /// First-run seed so the map is never blank. Returns whether anything
    /// was added.
    pub fn seed_if_empty(&mut self) -> bool {
        if !self.locations.is_empty() {
            return false;
        }
        self.locations.push(Location {
            id: LocationId::generate(),
            name: "Golden Gate Bridge".to_string(),
            desc: Some("An example saved place. Add your own from the map.".to_string()),
            lat: 37.8199,
            lng: -122.4783,
            hidden: false,
            group_id: None,
        });
        true
    }

    pub fn add(&mut self, draft: LocationDraft) -> &Location {
        let location = Location {
            id: LocationId::generate(),
            name: draft.name.trim().to_string(),
            desc: draft.desc.filter(|d| !d.trim().is_empty()),
            lat: draft.lat,
            lng: draft.lng,
            hidden: draft.hidden,
            group_id: draft.group_id,
        };
        self.locations.push(location);
        &self.locations[self.locations.len() - 1]
    }

    /// Applies a merge patch. Returns false when the id is unknown.
    /// An empty rename is ignored rather than applied.
    pub fn update(&mut self, id: &LocationId, patch: &LocationPatch) -> bool {
        let Some(location) = self.locations.iter_mut().find(|l| l.id == *id) else {
            return false;
        };

        if let Some(name) = &patch.name {
            let trimmed = name.trim();
            if !trimmed.is_empty() {
                location.name = trimmed.to_string();
            }
        }
        if let Some(desc) = &patch.desc {
            location.desc = desc.clone();
        }
        if let Some(lat) = patch.lat {
            location.lat = lat;
        }
        if let Some(lng) = patch.lng {
            location.lng = lng;
        }
        if let Some(hidden) = patch.hidden {
            location.hidden = hidden;
        }
        if let Some(group_id) = &patch.group_id {
            location.group_id = group_id.clone();
        }

        true
    }

    pub fn delete(&mut self, id: &LocationId) -> bool {
        let before = self.locations.len();
        self.locations.retain(|l| l.id != *id);
        self.locations.len() < before
    }

    pub fn add_group(&mut self, name: impl Into<String>) -> &Group {
        let group = Group {
            id: GroupId::generate(),
            name: name.into().trim().to_string(),
            collapsed: false,
        };
        self.groups.push(group);
        &self.groups[self.groups.len() - 1]
    }

    pub fn rename_group(&mut self, id: &GroupId, name: &str) -> bool {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return false;
        }
        let Some(group) = self.groups.iter_mut().find(|g| g.id == *id) else {
            return false;
        };
        group.name = trimmed.to_string();
        true
    }

    pub fn toggle_group_collapsed(&mut self, id: &GroupId) -> bool {
        let Some(group) = self.groups.iter_mut().find(|g| g.id == *id) else {
            return false;
        };
        group.collapsed = !group.collapsed;
        true
    }

    /// Deletes a group and every location assigned to it.
    pub fn delete_group(&mut self, id: &GroupId) -> bool {
        let before = self.groups.len();
        self.groups.retain(|g| g.id != *id);
        if self.groups.len() == before {
            return false;
        }

        let members_before = self.locations.len();
        self.locations.retain(|l| l.group_id.as_ref() != Some(id));
        info!(
            group = %id,
            removed_locations = members_before - self.locations.len(),
            "deleted group and its members"
        );
        true
    }

    /// Moves a location into a group, or out of any group with `None`.
    /// Fails when the location or the target group does not exist.
    pub fn assign_to_group(&mut self, id: &LocationId, group_id: Option<GroupId>) -> bool {
        if let Some(target) = &group_id {
            if self.group(target).is_none() {
                warn!(group = %target, "cannot assign to unknown group");
                return false;
            }
        }

        let Some(location) = self.locations.iter_mut().find(|l| l.id == *id) else {
            return false;
        };
        location.group_id = group_id;
        true
    }

    /// Bulk import from shell-parsed JSON (file drop, share sheet).
    ///
    /// Records are coerced leniently: `lat`/`lng` may be numbers or
    /// numeric strings, `hidden` a bool or the string `"true"`, and a
    /// missing id gets a fresh one. A record whose id already exists
    /// replaces the stored location in place. Any `group` reference
    /// inside a record is ignored; `target_group` decides membership.
    ///
    /// Returns true when at least one record made it into the store.
    pub fn import(&mut self, records: &Value, target_group: Option<&GroupId>) -> bool {
        let Some(records) = records.as_array() else {
            warn!("import payload is not a JSON array");
            return false;
        };

        let mut imported = 0_usize;
        let mut replaced = 0_usize;
        let mut skipped = 0_usize;

        for record in records {
            let Some(candidate) = Self::coerce_record(record, target_group) else {
                skipped += 1;
                continue;
            };

            if let Some(existing) = self.locations.iter_mut().find(|l| l.id == candidate.id) {
                *existing = candidate;
                replaced += 1;
            } else {
                self.locations.push(candidate);
                imported += 1;
            }
        }

        info!(imported, replaced, skipped, "import finished");
        imported + replaced > 0
    }

    fn coerce_record(record: &Value, target_group: Option<&GroupId>) -> Option<Location> {
        let name = record.get("name")?.as_str()?.trim();
        if name.is_empty() {
            return None;
        }

        let lat = Self::coerce_f64(record.get("lat")?)?;
        let lng = Self::coerce_f64(record.get("lng")?)?;

        let id = record
            .get("id")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map_or_else(LocationId::generate, LocationId::new);

        let desc = record
            .get("desc")
            .and_then(Value::as_str)
            .map(str::to_string);

        let hidden = record.get("hidden").is_some_and(|v| match v {
            Value::Bool(b) => *b,
            Value::String(s) => s.trim().eq_ignore_ascii_case("true"),
            _ => false,
        });

        Some(Location {
            id,
            name: name.to_string(),
            desc,
            lat,
            lng,
            hidden,
            group_id: target_group.cloned(),
        })
    }

    fn coerce_f64(value: &Value) -> Option<f64> {
        let parsed = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }?;
        parsed.is_finite().then_some(parsed)
    }

    pub fn members_of<'a>(&'a self, group_id: &'a GroupId) -> impl Iterator<Item = &'a Location> {
        self.locations
            .iter()
            .filter(move |l| l.group_id.as_ref() == Some(group_id))
    }

    /// Locations outside any group, including those whose group was
    /// deleted out from under them by an import of stale data.
    pub fn uncategorized(&self) -> impl Iterator<Item = &Location> {
        self.locations.iter().filter(|l| match &l.group_id {
            None => true,
            Some(group_id) => !self.groups.iter().any(|g| g.id == *group_id),
        })
    }

    pub fn visible(&self) -> impl Iterator<Item = &Location> {
        self.locations.iter().filter(|l| !l.hidden)
    }

    pub fn locations_blob(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&self.locations)
    }

    pub fn groups_blob(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(&self.groups)
    }

    pub fn decode_locations(bytes: &[u8]) -> Result<Vec<Location>, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    pub fn decode_groups(bytes: &[u8]) -> Result<Vec<Group>, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
