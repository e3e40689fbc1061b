// Copyright 2026 the buildings-map contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Building collection decoding.
//!
//! Converts a GeoJSON `FeatureCollection` as served by the buildings API into
//! plain [`Building`] records. The backend serializes Django model instances
//! with the `geojson` serializer, so each feature carries the model fields in
//! `properties` (including `pk` as a string and `rent` as a decimal string).

use chrono::{DateTime, Utc};
use geojson::{Feature, FeatureCollection, JsonObject, Value};
use log::warn;

/// A single rental building with a known point location.
#[derive(Debug, Clone, PartialEq)]
pub struct Building {
    /// Database primary key, when the serializer included one.
    pub pk: Option<i64>,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Free-form comment on the listing.
    pub comment: Option<String>,
    pub county: Option<String>,
    pub district: Option<String>,
    /// Monthly rent as a decimal string, as serialized by the backend.
    pub rent: Option<String>,
    pub payment_details: Option<String>,
    /// Whether the building is currently occupied.
    pub occupancy: Option<bool>,
}

impl Building {
    /// Human-readable label for lists and marker popups.
    #[must_use]
    pub fn label(&self) -> String {
        match (self.district.as_deref(), self.county.as_deref()) {
            (Some(district), Some(county)) => format!("{district}, {county}"),
            (Some(district), None) => district.to_owned(),
            (None, Some(county)) => county.to_owned(),
            (None, None) => match self.pk {
                Some(pk) => format!("Building #{pk}"),
                None => "Building".to_owned(),
            },
        }
    }
}

/// An immutable set of buildings decoded from one API response.
#[derive(Debug, Clone)]
pub struct BuildingCollection {
    /// Buildings with a valid point geometry, in response order.
    pub buildings: Vec<Building>,
    /// Features dropped for a missing or non-point geometry.
    pub skipped: usize,
    /// When the response was decoded.
    pub fetched_at: DateTime<Utc>,
}

impl BuildingCollection {
    /// Decode a GeoJSON feature collection, skipping unusable features.
    #[must_use]
    pub fn from_features(fc: FeatureCollection) -> Self {
        let mut buildings = Vec::with_capacity(fc.features.len());
        let mut skipped = 0;

        for feature in fc.features {
            match building_from_feature(feature) {
                Some(building) => buildings.push(building),
                None => skipped += 1,
            }
        }

        Self {
            buildings,
            skipped,
            fetched_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buildings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Building> {
        self.buildings.iter()
    }
}

impl<'a> IntoIterator for &'a BuildingCollection {
    type Item = &'a Building;
    type IntoIter = std::slice::Iter<'a, Building>;

    fn into_iter(self) -> Self::IntoIter {
        self.buildings.iter()
    }
}

fn building_from_feature(feature: Feature) -> Option<Building> {
    let Some(geometry) = feature.geometry else {
        warn!("skipping building feature without a geometry");
        return None;
    };

    // GeoJSON point order is [lon, lat]
    let (longitude, latitude) = match geometry.value {
        Value::Point(ref coords) if coords.len() >= 2 => (coords[0], coords[1]),
        ref other => {
            warn!("skipping building feature with non-point geometry: {}", geometry_kind(other));
            return None;
        }
    };

    let props = feature.properties;
    let pk = property_i64(props.as_ref(), "pk").or_else(|| id_as_i64(feature.id.as_ref()));

    Some(Building {
        pk,
        latitude,
        longitude,
        comment: property_string(props.as_ref(), "comment"),
        county: property_string(props.as_ref(), "county"),
        district: property_string(props.as_ref(), "district"),
        rent: property_decimal(props.as_ref(), "rent"),
        payment_details: property_string(props.as_ref(), "payment_details"),
        occupancy: props.as_ref().and_then(|p| p.get("occupancy")).and_then(serde_json::Value::as_bool),
    })
}

fn geometry_kind(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}

fn property_string(props: Option<&JsonObject>, key: &str) -> Option<String> {
    props?.get(key)?.as_str().map(str::to_owned)
}

/// The serializer emits `pk` as a string, but accept a bare number too.
fn property_i64(props: Option<&JsonObject>, key: &str) -> Option<i64> {
    let value = props?.get(key)?;
    value
        .as_i64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

/// Decimal fields arrive as strings; tolerate numbers from older backends.
fn property_decimal(props: Option<&JsonObject>, key: &str) -> Option<String> {
    let value = props?.get(key)?;
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn id_as_i64(id: Option<&geojson::feature::Id>) -> Option<i64> {
    match id? {
        geojson::feature::Id::Number(n) => n.as_i64(),
        geojson::feature::Id::String(s) => s.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geojson::GeoJson;

    fn collection_from(json: &str) -> BuildingCollection {
        let GeoJson::FeatureCollection(fc) = json.parse::<GeoJson>().unwrap() else {
            panic!("test input is not a feature collection");
        };
        BuildingCollection::from_features(fc)
    }

    #[test]
    fn test_point_feature_becomes_building() {
        let collection = collection_from(
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature",
                 "geometry":{"type":"Point","coordinates":[36.82,-1.29]},
                 "properties":{}}
            ]}"#,
        );

        assert_eq!(collection.len(), 1);
        assert_eq!(collection.skipped, 0);
        let building = &collection.buildings[0];
        // GeoJSON order is [lon, lat]
        assert!((building.latitude - -1.29).abs() < 1e-9);
        assert!((building.longitude - 36.82).abs() < 1e-9);
    }

    #[test]
    fn test_empty_collection() {
        let collection = collection_from(r#"{"type":"FeatureCollection","features":[]}"#);
        assert!(collection.is_empty());
        assert_eq!(collection.skipped, 0);
    }

    #[test]
    fn test_feature_without_geometry_is_skipped() {
        let collection = collection_from(
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","geometry":null,"properties":{"district":"Westlands"}},
                {"type":"Feature",
                 "geometry":{"type":"Point","coordinates":[36.8219,-1.2921]},
                 "properties":{}}
            ]}"#,
        );

        assert_eq!(collection.len(), 1);
        assert_eq!(collection.skipped, 1);
    }

    #[test]
    fn test_non_point_geometry_is_skipped() {
        let collection = collection_from(
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature",
                 "geometry":{"type":"LineString","coordinates":[[0,0],[1,1]]},
                 "properties":{}}
            ]}"#,
        );

        assert!(collection.is_empty());
        assert_eq!(collection.skipped, 1);
    }

    #[test]
    fn test_django_style_properties() {
        let collection = collection_from(
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature",
                 "geometry":{"type":"Point","coordinates":[36.8219,-1.2921]},
                 "properties":{
                    "pk":"7",
                    "model":"buildings.building",
                    "comment":"corner unit",
                    "county":"Nairobi",
                    "district":"Westlands",
                    "rent":"45000.00",
                    "payment_details":"M-Pesa 555",
                    "occupancy":true}}
            ]}"#,
        );

        let building = &collection.buildings[0];
        assert_eq!(building.pk, Some(7));
        assert_eq!(building.county.as_deref(), Some("Nairobi"));
        assert_eq!(building.district.as_deref(), Some("Westlands"));
        assert_eq!(building.rent.as_deref(), Some("45000.00"));
        assert_eq!(building.payment_details.as_deref(), Some("M-Pesa 555"));
        assert_eq!(building.occupancy, Some(true));
        assert_eq!(building.label(), "Westlands, Nairobi");
    }

    #[test]
    fn test_numeric_pk_and_rent() {
        let collection = collection_from(
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","id":3,
                 "geometry":{"type":"Point","coordinates":[36.9,-1.3]},
                 "properties":{"rent":12000}}
            ]}"#,
        );

        let building = &collection.buildings[0];
        assert_eq!(building.pk, Some(3));
        assert_eq!(building.rent.as_deref(), Some("12000"));
    }

    #[test]
    fn test_label_fallbacks() {
        let building = Building {
            pk: Some(9),
            latitude: 0.0,
            longitude: 0.0,
            comment: None,
            county: None,
            district: None,
            rent: None,
            payment_details: None,
            occupancy: None,
        };
        assert_eq!(building.label(), "Building #9");
    }
}
