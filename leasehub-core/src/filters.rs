//! Query filters and aggregation pipelines
//!
//! All user-supplied text is regex-escaped before it reaches the
//! database; matching is case-insensitive.

use bson::{doc, Bson, Document, Regex};
use serde::Deserialize;

use crate::models::{PropertyKind, PropertyType};
use crate::pagination::Pagination;

/// Case-insensitive substring match.
pub fn ci_contains(text: &str) -> Bson {
    Bson::RegularExpression(Regex {
        pattern: regex::escape(text.trim()),
        options: "i".to_owned(),
    })
}

/// Case-insensitive whole-value match.
pub fn ci_exact(text: &str) -> Bson {
    Bson::RegularExpression(Regex {
        pattern: format!("^{}$", regex::escape(text.trim())),
        options: "i".to_owned(),
    })
}

/// `{ $or: [ {field: /text/i}, ... ] }`
pub fn any_field_contains(fields: &[&str], text: &str) -> Document {
    let pattern = ci_contains(text);
    let clauses: Vec<Document> = fields
        .iter()
        .map(|field| doc! { *field: pattern.clone() })
        .collect();
    doc! { "$or": clauses }
}

/// Numeric bounds from `"min-max"`; either side may be blank.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Range {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Range {
    pub fn parse(raw: &str) -> Option<Self> {
        let (min, max) = match raw.split_once('-') {
            Some((min, max)) => (min, max),
            None => (raw, ""),
        };
        let bound = |s: &str| s.trim().parse::<f64>().ok().filter(|v| v.is_finite());
        let range = Self {
            min: bound(min),
            max: bound(max),
        };
        (range.min.is_some() || range.max.is_some()).then_some(range)
    }

    pub fn to_bson(self) -> Document {
        let mut cond = Document::new();
        if let Some(min) = self.min {
            cond.insert("$gte", min);
        }
        if let Some(max) = self.max {
            cond.insert("$lte", max);
        }
        cond
    }
}

pub fn parse_range(raw: &str) -> Option<Range> {
    Range::parse(raw)
}

/// Filter for the plain property listing.
pub fn core_list_filter(search: Option<&str>) -> Document {
    match search.map(str::trim).filter(|s| !s.is_empty()) {
        Some(text) => any_field_contains(&["buildingName", "location.city", "location.address"], text),
        None => Document::new(),
    }
}

/// Search parameters accepted by every property search endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PropertySearch {
    pub search: Option<String>,
    pub city: Option<String>,
    pub zone: Option<String>,
    pub location_of_property: Option<String>,
    pub furnishing_level: Option<String>,
    pub building_name: Option<String>,
    pub price_range: Option<String>,
    pub seating_capacity: Option<String>,
    pub area_sqft: Option<String>,
    #[serde(rename = "availability_status", alias = "availabilitystatus")]
    pub availability_status: Option<String>,
    #[serde(rename = "is_active")]
    pub is_active: Option<String>,
    pub page: Option<String>,
    pub size: Option<String>,
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Rent per seat as a number, whether stored as a number or as text such
/// as "Rs.8,500/- Per seat".
fn numeric_rent_stage() -> Document {
    doc! {
        "$addFields": {
            "numericRent": {
                "$switch": {
                    "branches": [
                        {
                            "case": { "$in": [{ "$type": "$generalInfo.rentPerSeat" }, ["double", "int", "long", "decimal"]] },
                            "then": { "$toDouble": "$generalInfo.rentPerSeat" },
                        },
                        {
                            "case": { "$eq": [{ "$type": "$generalInfo.rentPerSeat" }, "string"] },
                            "then": {
                                "$convert": {
                                    "input": {
                                        "$let": {
                                            "vars": {
                                                "m": {
                                                    "$regexFind": {
                                                        "input": { "$replaceAll": {
                                                            "input": "$generalInfo.rentPerSeat",
                                                            "find": ",",
                                                            "replacement": "",
                                                        }},
                                                        "regex": "[0-9]+(\\.[0-9]+)?",
                                                    }
                                                }
                                            },
                                            "in": { "$ifNull": ["$$m.match", "0"] },
                                        }
                                    },
                                    "to": "double",
                                    "onError": 0,
                                    "onNull": 0,
                                }
                            },
                        },
                    ],
                    "default": 0,
                }
            }
        }
    }
}

impl PropertySearch {
    pub fn pagination<K: PropertyKind>(&self) -> Pagination {
        crate::pagination::PageQuery {
            page: self.page.clone(),
            size: self.size.clone(),
        }
        .with_default_size(K::DEFAULT_SEARCH_SIZE)
    }

    /// `$match` body for everything except the rent range.
    pub fn match_filter(&self) -> Document {
        let mut filter = Document::new();

        if let Some(text) = present(&self.search) {
            filter.extend(any_field_contains(
                &[
                    "buildingName",
                    "location.city",
                    "location.address",
                    "location.zone",
                    "propertyId",
                ],
                text,
            ));
        }
        let exact = [
            ("location.city", &self.city),
            ("location.zone", &self.zone),
            ("location.locationOfProperty", &self.location_of_property),
            ("generalInfo.furnishingLevel", &self.furnishing_level),
            ("buildingName", &self.building_name),
            ("availability_status", &self.availability_status),
        ];
        for (field, value) in exact {
            if let Some(value) = present(value) {
                filter.insert(field, ci_exact(value));
            }
        }
        if let Some(range) = present(&self.seating_capacity).and_then(parse_range) {
            filter.insert("generalInfo.seaterOffered", range.to_bson());
        }
        if let Some(range) = present(&self.area_sqft).and_then(Range::parse) {
            filter.insert("location.areaSqft", range.to_bson());
        }
        if let Some(active) = present(&self.is_active).and_then(parse_flag) {
            filter.insert("is_active", active);
        }
        filter
    }

    /// Full aggregation: optional rent normalisation, filters, newest
    /// first, and a `$facet` yielding `data` and `total`.
    pub fn pipeline<K: PropertyKind>(&self, page: Pagination) -> Vec<Document> {
        let mut pipeline = Vec::new();
        let mut filter = self.match_filter();

        if let Some(range) = present(&self.price_range).and_then(Range::parse) {
            if K::TEXT_RENT {
                pipeline.push(numeric_rent_stage());
                filter.insert("numericRent", range.to_bson());
            } else {
                filter.insert("generalInfo.rentPerSeat", range.to_bson());
            }
        }

        if !filter.is_empty() {
            pipeline.push(doc! { "$match": filter });
        }
        if K::TEXT_RENT && present(&self.price_range).is_some() {
            pipeline.push(doc! { "$unset": "numericRent" });
        }
        pipeline.push(doc! { "$sort": { "createdAt": -1 } });
        pipeline.push(facet(page));
        pipeline
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => Some(true),
        "false" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

/// `$facet` stage producing one page plus the total count.
pub fn facet(page: Pagination) -> Document {
    doc! {
        "$facet": {
            "data": [ { "$skip": page.skip() as i64 }, { "$limit": page.limit() } ],
            "total": [ { "$count": "count" } ],
        }
    }
}

/// Pull `(data, total)` out of a [`facet`] result document.
pub fn unpack_facet(result: Option<Document>) -> (Vec<Document>, u64) {
    let Some(result) = result else {
        return (Vec::new(), 0);
    };
    let data = result
        .get_array("data")
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.as_document().cloned())
                .collect()
        })
        .unwrap_or_default();
    let total = result
        .get_array("total")
        .ok()
        .and_then(|t| t.first())
        .and_then(Bson::as_document)
        .and_then(|d| match d.get("count") {
            Some(Bson::Int32(n)) => u64::try_from(*n).ok(),
            Some(Bson::Int64(n)) => u64::try_from(*n).ok(),
            _ => None,
        })
        .unwrap_or(0);
    (data, total)
}

/// Filters accepted by the cross-collection property search.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AllPropertiesSearch {
    pub search: Option<String>,
    pub city: Option<String>,
    pub zone: Option<String>,
    #[serde(rename = "availability_status", alias = "availabilitystatus")]
    pub availability_status: Option<String>,
    pub page: Option<String>,
    pub size: Option<String>,
}

impl AllPropertiesSearch {
    fn match_filter(&self) -> Document {
        let mut and = Vec::new();
        if let Some(text) = present(&self.search) {
            and.push(any_field_contains(
                &[
                    "buildingName",
                    "location.city",
                    "location.address",
                    "location.zone",
                    "propertyId",
                ],
                text,
            ));
        }
        if let Some(city) = present(&self.city) {
            and.push(doc! { "location.city": ci_contains(city) });
        }
        if let Some(zone) = present(&self.zone) {
            and.push(doc! { "location.zone": ci_contains(zone) });
        }
        if let Some(status) = present(&self.availability_status) {
            and.push(doc! { "availability_status": ci_contains(status) });
        }
        if and.is_empty() {
            Document::new()
        } else {
            doc! { "$and": and }
        }
    }

    fn per_collection(&self, kind: PropertyType) -> Vec<Document> {
        let filter = self.match_filter();
        let mut stages = Vec::new();
        if !filter.is_empty() {
            stages.push(doc! { "$match": filter });
        }
        stages.push(doc! {
            "$project": {
                "_id": 1,
                "propertyId": 1,
                "buildingName": 1,
                "location": 1,
                "availability_status": 1,
                "is_active": 1,
                "generalInfo": 1,
                "createdAt": 1,
                "propertyType": { "$literal": kind.tag() },
            }
        });
        stages
    }

    /// Pipeline to run against the co-working collection; the other two
    /// collections are folded in with `$unionWith`.
    pub fn pipeline(&self, page: Pagination) -> Vec<Document> {
        let mut pipeline = self.per_collection(PropertyType::CoWorking);
        for kind in [PropertyType::Office, PropertyType::Managed] {
            pipeline.push(doc! {
                "$unionWith": {
                    "coll": kind.collection(),
                    "pipeline": self.per_collection(kind),
                }
            });
        }
        pipeline.push(doc! { "$sort": { "createdAt": -1 } });
        pipeline.push(facet(page));
        pipeline
    }
}

pub fn all_properties_pipeline(search: &AllPropertiesSearch, page: Pagination) -> Vec<Document> {
    search.pipeline(page)
}
