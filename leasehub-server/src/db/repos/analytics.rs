//! Lead reporting

use std::collections::BTreeMap;

use bson::{doc, oid::ObjectId, Document};
use futures::TryStreamExt;
use mongodb::Database;
use serde::{Deserialize, Serialize};

use leasehub_core::models::{Lead, User};

use super::DbError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentPerformance {
    #[serde(serialize_with = "bson::serde_helpers::serialize_object_id_as_hex_string")]
    pub agent_id: ObjectId,
    #[serde(default)]
    pub agent_name: String,
    pub total_leads: i64,
    pub converted_leads: i64,
    pub conversion_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadSummary {
    pub total_leads: i64,
    pub status_counts: BTreeMap<String, i64>,
    pub agent_performance: Vec<AgentPerformance>,
}

#[derive(Debug, Deserialize)]
struct StatusCount {
    #[serde(rename = "_id")]
    status: Option<String>,
    count: i64,
}

fn agent_pipeline() -> Vec<Document> {
    vec![
        doc! {
            "$group": {
                "_id": "$assignedAgentId",
                "totalLeads": { "$sum": 1 },
                "convertedLeads": {
                    "$sum": { "$cond": [ { "$eq": ["$status", "converted"] }, 1, 0 ] }
                },
            }
        },
        doc! {
            "$lookup": {
                "from": User::COLLECTION,
                "localField": "_id",
                "foreignField": "_id",
                "as": "agent",
            }
        },
        doc! { "$unwind": "$agent" },
        doc! {
            "$project": {
                "_id": 0,
                "agentId": "$_id",
                "agentName": "$agent.fullName",
                "totalLeads": { "$toLong": "$totalLeads" },
                "convertedLeads": { "$toLong": "$convertedLeads" },
                "conversionRate": {
                    "$cond": [
                        { "$eq": ["$totalLeads", 0] },
                        0.0,
                        { "$divide": ["$convertedLeads", "$totalLeads"] },
                    ]
                },
            }
        },
        doc! { "$sort": { "totalLeads": -1 } },
    ]
}

pub struct AnalyticsRepo<'a> {
    db: &'a Database,
}

impl<'a> AnalyticsRepo<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Lead totals by status and per-agent conversion, busiest agent first.
    pub async fn lead_summary(&self) -> Result<LeadSummary, DbError> {
        let leads = self.db.collection::<Document>(Lead::COLLECTION);

        let mut by_status = leads
            .aggregate(vec![
                doc! { "$group": { "_id": "$status", "count": { "$sum": 1 } } },
                doc! { "$project": { "count": { "$toLong": "$count" } } },
            ])
            .with_type::<StatusCount>()
            .await?;
        let mut summary = LeadSummary::default();
        while let Some(row) = by_status.try_next().await? {
            summary.total_leads += row.count;
            let status = row.status.unwrap_or_else(|| "unknown".to_owned());
            *summary.status_counts.entry(status).or_default() += row.count;
        }

        let agents = leads
            .aggregate(agent_pipeline())
            .with_type::<AgentPerformance>()
            .await?;
        summary.agent_performance = agents.try_collect().await?;
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_summary_shape() {
        let json = serde_json::to_value(LeadSummary::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "totalLeads": 0, "statusCounts": {}, "agentPerformance": [] })
        );
    }

    #[test]
    fn agent_ids_serialize_as_hex() {
        let id = ObjectId::new();
        let json = serde_json::to_value(AgentPerformance {
            agent_id: id,
            agent_name: "Asha".into(),
            total_leads: 4,
            converted_leads: 1,
            conversion_rate: 0.25,
        })
        .unwrap();
        assert_eq!(json["agentId"], id.to_hex());
        assert_eq!(json["conversionRate"], 0.25);
    }
}
