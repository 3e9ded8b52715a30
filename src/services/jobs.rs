// src/services/jobs.rs
//
// Read-side companions of the import workflow: the single-customer view and
// the rep/admin jobs aggregation. Both treat the CRM as best-effort beyond
// the one fetch that defines "found".

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use utoipa::ToSchema;

use crate::{
    common::error::AppError,
    config::CrmConfig,
    crm::{CrmExecutor, QueryDoc},
    models::{
        crm::{CrmDocument, CustomerJobs, JobSummary},
        lead::Lead,
    },
};

/// The CRM rejects oversized `in` filters; ids are batched at this size.
pub const CRM_BATCH_SIZE: usize = 10;

#[async_trait]
pub trait ImportedLeadSource: Send + Sync {
    /// Imported leads carrying an integration id. `None` is the admin scope.
    async fn list_imported(&self, rep_uid: Option<&str>) -> Result<Vec<Lead>, AppError>;
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerDetail {
    #[schema(value_type = Object)]
    pub customer: Value,
    #[schema(value_type = Vec<Object>)]
    pub jobs: Vec<Value>,
    #[schema(value_type = Vec<Object>)]
    pub locations: Vec<Value>,
}

#[derive(Clone)]
pub struct JobsService {
    crm: Arc<dyn CrmExecutor>,
    source: Arc<dyn ImportedLeadSource>,
    config: Arc<CrmConfig>,
}

impl JobsService {
    pub fn new(
        crm: Arc<dyn CrmExecutor>,
        source: Arc<dyn ImportedLeadSource>,
        config: Arc<CrmConfig>,
    ) -> Self {
        Self { crm, source, config }
    }

    fn organization_id(&self) -> Result<&str, AppError> {
        self.config
            .organization_id
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("CRM organization id is not configured").into())
    }

    /// Fetches one CRM customer with its jobs and locations merged into a
    /// single response. The account fetch decides 404; the two dependent
    /// fetches run concurrently and fail soft.
    pub async fn get_customer(
        &self,
        grant_key: &str,
        customer_id: &str,
    ) -> Result<CustomerDetail, AppError> {
        let organization_id = self.organization_id()?.to_string();

        let account_doc = QueryDoc::select().child(
            "account",
            QueryDoc::op(json!({ "id": customer_id }))
                .fields(&["id", "name", "createdAt", "type"])
                .child(
                    "customFieldValues",
                    QueryDoc::op(json!({ "size": 25 })).child(
                        "nodes",
                        QueryDoc::select()
                            .field("value")
                            .child("customField", QueryDoc::select().field("name")),
                    ),
                ),
        );

        let response = self.crm.execute(grant_key, account_doc).await?;
        let customer = response["account"].clone();
        if customer["id"].as_str().is_none() {
            return Err(AppError::NotFound("Customer not found.".into()));
        }

        let jobs_doc = scoped_list_doc(&organization_id, "jobs", customer_id);
        let locations_doc = scoped_list_doc(&organization_id, "locations", customer_id);

        let (jobs_response, locations_response) = tokio::join!(
            self.crm.execute(grant_key, jobs_doc),
            self.crm.execute(grant_key, locations_doc)
        );

        Ok(CustomerDetail {
            customer,
            jobs: soft_nodes(jobs_response, "jobs"),
            locations: soft_nodes(locations_response, "locations"),
        })
    }

    /// Enriches the caller's imported leads with CRM jobs, contracts and
    /// estimates. Every CRM batch is independently fault-tolerant; a failed
    /// batch leaves its customers with empty arrays.
    pub async fn list_jobs(
        &self,
        grant_key: &str,
        rep_uid: Option<&str>,
    ) -> Result<Vec<CustomerJobs>, AppError> {
        let organization_id = self.organization_id()?.to_string();
        let leads = self.source.list_imported(rep_uid).await?;

        let mut customers: Vec<CustomerJobs> = Vec::with_capacity(leads.len());
        let mut index_by_customer: HashMap<String, usize> = HashMap::new();
        for lead in &leads {
            let Some(customer_id) = lead.integration_id.clone() else {
                continue;
            };
            // A shared integration id can only come from out-of-band edits;
            // the first lead wins and later duplicates are dropped.
            if index_by_customer.contains_key(&customer_id) {
                continue;
            }
            index_by_customer.insert(customer_id.clone(), customers.len());
            customers.push(CustomerJobs {
                lead_id: lead.lead_id.clone(),
                customer_id,
                customer_name: None,
                sales_rep: lead.sales_rep.clone(),
                jobs: Vec::new(),
                contracts: Vec::new(),
                estimates: Vec::new(),
            });
        }

        // Pass 1: accounts and their jobs, in id batches.
        let customer_ids: Vec<String> =
            customers.iter().map(|c| c.customer_id.clone()).collect();
        let mut job_owner: HashMap<String, String> = HashMap::new();

        for batch in customer_ids.chunks(CRM_BATCH_SIZE) {
            let doc = QueryDoc::select().child(
                "organization",
                QueryDoc::op(json!({ "id": organization_id })).child(
                    "accounts",
                    QueryDoc::op(json!({ "where": ["id", "in", batch], "size": batch.len() }))
                        .child(
                            "nodes",
                            QueryDoc::select().fields(&["id", "name", "createdAt"]).child(
                                "jobs",
                                QueryDoc::select().child(
                                    "nodes",
                                    QueryDoc::select().fields(&["id", "name", "createdAt"]),
                                ),
                            ),
                        ),
                ),
            );

            let response = match self.crm.execute(grant_key, doc).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!("account batch fetch failed, skipping {} ids: {e}", batch.len());
                    continue;
                }
            };

            for account in iter_array(&response["organization"]["accounts"]["nodes"]) {
                let Some(account_id) = account["id"].as_str() else {
                    continue;
                };
                let Some(&index) = index_by_customer.get(account_id) else {
                    continue;
                };
                let customer = &mut customers[index];
                customer.customer_name = account["name"].as_str().map(str::to_string);
                for job in iter_array(&account["jobs"]["nodes"]) {
                    let Some(job_id) = job["id"].as_str() else {
                        continue;
                    };
                    job_owner.insert(job_id.to_string(), account_id.to_string());
                    customer.jobs.push(JobSummary {
                        id: job_id.to_string(),
                        name: job["name"].as_str().map(str::to_string),
                        created_at: job["createdAt"].as_str().map(str::to_string),
                    });
                }
            }
        }

        // Pass 2: documents per job-id batch, classified by name substring.
        let job_ids: Vec<String> = job_owner.keys().cloned().collect();
        for batch in job_ids.chunks(CRM_BATCH_SIZE) {
            let doc = QueryDoc::select().child(
                "organization",
                QueryDoc::op(json!({ "id": organization_id })).child(
                    "documents",
                    QueryDoc::op(json!({ "where": ["jobId", "in", batch] })).child(
                        "nodes",
                        QueryDoc::select().fields(&["id", "name", "price", "status", "jobId"]),
                    ),
                ),
            );

            let response = match self.crm.execute(grant_key, doc).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!("document batch fetch failed, skipping {} jobs: {e}", batch.len());
                    continue;
                }
            };

            for node in iter_array(&response["organization"]["documents"]["nodes"]) {
                let Some(job_id) = node["jobId"].as_str() else {
                    continue;
                };
                let Some(index) = job_owner
                    .get(job_id)
                    .and_then(|account_id| index_by_customer.get(account_id))
                else {
                    continue;
                };
                let customer = &mut customers[*index];
                match classify_document(node) {
                    Some(DocumentKind::Contract(doc)) => customer.contracts.push(doc),
                    Some(DocumentKind::Estimate(doc)) => customer.estimates.push(doc),
                    None => {}
                }
            }
        }

        Ok(customers)
    }
}

fn scoped_list_doc(organization_id: &str, collection: &str, customer_id: &str) -> QueryDoc {
    QueryDoc::select().child(
        "organization",
        QueryDoc::op(json!({ "id": organization_id })).child(
            collection,
            QueryDoc::op(json!({
                "where": ["accountId", "=", customer_id],
                "sortBy": [{ "field": "createdAt", "order": "desc" }],
            }))
            .child(
                "nodes",
                QueryDoc::select().fields(&["id", "name", "createdAt"]),
            ),
        ),
    )
}

fn soft_nodes(response: Result<Value, crate::crm::CrmError>, collection: &str) -> Vec<Value> {
    match response {
        Ok(value) => iter_array(&value["organization"][collection]["nodes"])
            .cloned()
            .collect(),
        Err(e) => {
            tracing::warn!("{collection} fetch failed for customer view: {e}");
            Vec::new()
        }
    }
}

fn iter_array(value: &Value) -> impl Iterator<Item = &Value> {
    value.as_array().map(|a| a.iter()).into_iter().flatten()
}

enum DocumentKind {
    Contract(CrmDocument),
    Estimate(CrmDocument),
}

/// Case-insensitive substring match on the document's full name; anything
/// that is neither a contract nor an estimate is dropped.
fn classify_document(node: &Value) -> Option<DocumentKind> {
    let name = node["name"].as_str()?;
    let lower = name.to_lowercase();

    let doc = CrmDocument {
        id: node["id"].as_str().unwrap_or_default().to_string(),
        name: name.to_string(),
        price: node["price"].as_f64().unwrap_or(0.0),
        status: node["status"].as_str().unwrap_or_default().to_string(),
    };

    if lower.contains("contract") {
        Some(DocumentKind::Contract(doc))
    } else if lower.contains("estimate") {
        Some(DocumentKind::Estimate(doc))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crm::client::CrmError;
    use chrono::Utc;
    use std::sync::Mutex;

    struct FakeCrm {
        calls: Mutex<Vec<Value>>,
        /// 1-based indices of account batches that fail.
        fail_account_batches: Vec<usize>,
    }

    impl FakeCrm {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_account_batches: Vec::new(),
            }
        }

        fn account_batches(&self) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|doc| !doc["organization"]["accounts"].is_null())
                .count()
        }

        fn document_batches(&self) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|doc| !doc["organization"]["documents"].is_null())
                .count()
        }
    }

    #[async_trait]
    impl CrmExecutor for FakeCrm {
        async fn execute(&self, _grant_key: &str, doc: QueryDoc) -> Result<Value, CrmError> {
            let value = serde_json::to_value(&doc).unwrap();
            self.calls.lock().unwrap().push(value.clone());

            if !value["organization"]["accounts"].is_null() {
                let batch_index = self.account_batches();
                if self.fail_account_batches.contains(&batch_index) {
                    return Err(CrmError::Status {
                        status: 500,
                        reason: "Internal Server Error".to_string(),
                        body: "batch failed".to_string(),
                    });
                }
                // Echo one account per requested id, each with one job.
                let ids = value["organization"]["accounts"]["$"]["where"][2]
                    .as_array()
                    .cloned()
                    .unwrap_or_default();
                let nodes: Vec<Value> = ids
                    .iter()
                    .filter_map(|id| id.as_str())
                    .map(|id| {
                        json!({
                            "id": id,
                            "name": format!("Customer {id}"),
                            "createdAt": "2026-01-01T00:00:00Z",
                            "jobs": { "nodes": [
                                { "id": format!("job_{id}"), "name": "Main Job",
                                  "createdAt": "2026-01-02T00:00:00Z" }
                            ]}
                        })
                    })
                    .collect();
                return Ok(json!({ "organization": { "accounts": { "nodes": nodes } } }));
            }

            if !value["organization"]["documents"].is_null() {
                let job_ids = value["organization"]["documents"]["$"]["where"][2]
                    .as_array()
                    .cloned()
                    .unwrap_or_default();
                let nodes: Vec<Value> = job_ids
                    .iter()
                    .filter_map(|id| id.as_str())
                    .flat_map(|job_id| {
                        vec![
                            json!({ "id": format!("doc_c_{job_id}"), "name": "Signed CONTRACT",
                                    "price": 1200.5, "status": "approved", "jobId": job_id }),
                            json!({ "id": format!("doc_e_{job_id}"), "name": "Initial Estimate",
                                    "jobId": job_id }),
                            json!({ "id": format!("doc_x_{job_id}"), "name": "Invoice",
                                    "price": 10, "status": "sent", "jobId": job_id }),
                        ]
                    })
                    .collect();
                return Ok(json!({ "organization": { "documents": { "nodes": nodes } } }));
            }

            Ok(json!({}))
        }
    }

    struct FakeSource {
        leads: Vec<Lead>,
    }

    #[async_trait]
    impl ImportedLeadSource for FakeSource {
        async fn list_imported(&self, rep_uid: Option<&str>) -> Result<Vec<Lead>, AppError> {
            Ok(self
                .leads
                .iter()
                .filter(|l| rep_uid.is_none_or(|uid| l.sales_rep == uid))
                .cloned()
                .collect())
        }
    }

    fn imported_lead(n: usize) -> Lead {
        Lead {
            lead_id: format!("L{n}"),
            name: format!("Lead {n}"),
            email: None,
            phone: None,
            address: None,
            city: None,
            state: None,
            zipcode: None,
            project_interest: None,
            budget: None,
            finance_need: None,
            channel: None,
            click_source: None,
            website_source: None,
            ad_source: None,
            status: "Imported".to_string(),
            follow_up_date: None,
            sales_rep: "rep1".to_string(),
            integration_id: Some(format!("acct_{n}")),
            integration_platform: Some("JobTread".to_string()),
            commission_rate: None,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn service(crm: Arc<FakeCrm>, leads: Vec<Lead>) -> JobsService {
        JobsService::new(
            crm,
            Arc::new(FakeSource { leads }),
            Arc::new(crate::config::CrmConfig {
                organization_id: Some("org1".to_string()),
                checklist_template_id: None,
                admin_grant_key: None,
                is_production: true,
            }),
        )
    }

    #[tokio::test]
    async fn twenty_five_leads_issue_exactly_three_account_batches() {
        let crm = Arc::new(FakeCrm::new());
        let leads: Vec<Lead> = (1..=25).map(imported_lead).collect();

        let customers = service(crm.clone(), leads)
            .list_jobs("gk1", Some("rep1"))
            .await
            .unwrap();

        assert_eq!(customers.len(), 25);
        assert_eq!(crm.account_batches(), 3);
        // 25 jobs also batch at 10.
        assert_eq!(crm.document_batches(), 3);
        assert!(customers.iter().all(|c| c.jobs.len() == 1));
        assert!(customers.iter().all(|c| c.contracts.len() == 1));
        assert!(customers.iter().all(|c| c.estimates.len() == 1));
    }

    #[tokio::test]
    async fn failed_batch_leaves_its_customers_empty_but_not_others() {
        let crm = Arc::new(FakeCrm {
            calls: Mutex::new(Vec::new()),
            fail_account_batches: vec![2],
        });
        let leads: Vec<Lead> = (1..=25).map(imported_lead).collect();

        let customers = service(crm.clone(), leads)
            .list_jobs("gk1", Some("rep1"))
            .await
            .unwrap();

        assert_eq!(crm.account_batches(), 3);
        let enriched = customers.iter().filter(|c| !c.jobs.is_empty()).count();
        let empty = customers.iter().filter(|c| c.jobs.is_empty()).count();
        assert_eq!(enriched, 15);
        assert_eq!(empty, 10);
        // The failed batch's customers are still present in the output.
        assert_eq!(customers.len(), 25);
    }

    #[tokio::test]
    async fn documents_classify_by_case_insensitive_substring() {
        let crm = Arc::new(FakeCrm::new());
        let customers = service(crm, vec![imported_lead(1)])
            .list_jobs("gk1", None)
            .await
            .unwrap();

        let customer = &customers[0];
        assert_eq!(customer.contracts.len(), 1);
        assert_eq!(customer.contracts[0].name, "Signed CONTRACT");
        assert_eq!(customer.contracts[0].price, 1200.5);
        assert_eq!(customer.contracts[0].status, "approved");
        // The estimate carries defaults for missing price/status.
        assert_eq!(customer.estimates.len(), 1);
        assert_eq!(customer.estimates[0].price, 0.0);
        assert_eq!(customer.estimates[0].status, "");
        // The invoice matched neither bucket.
    }

    #[tokio::test]
    async fn leads_sharing_an_integration_id_collapse_to_the_first() {
        let crm = Arc::new(FakeCrm::new());
        let mut duplicate = imported_lead(2);
        duplicate.integration_id = Some("acct_1".to_string());

        let customers = service(crm, vec![imported_lead(1), duplicate])
            .list_jobs("gk1", None)
            .await
            .unwrap();

        assert_eq!(customers.len(), 1);
        assert_eq!(customers[0].lead_id, "L1");
        assert_eq!(customers[0].customer_id, "acct_1");
        assert_eq!(customers[0].jobs.len(), 1);
    }

    #[tokio::test]
    async fn get_customer_missing_account_is_404() {
        struct NullCrm;

        #[async_trait]
        impl CrmExecutor for NullCrm {
            async fn execute(&self, _g: &str, _d: QueryDoc) -> Result<Value, CrmError> {
                Ok(json!({ "account": null }))
            }
        }

        let service = JobsService::new(
            Arc::new(NullCrm),
            Arc::new(FakeSource { leads: vec![] }),
            Arc::new(crate::config::CrmConfig {
                organization_id: Some("org1".to_string()),
                checklist_template_id: None,
                admin_grant_key: None,
                is_production: true,
            }),
        );

        let err = service.get_customer("gk1", "missing").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
