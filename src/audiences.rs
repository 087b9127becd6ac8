use crate::client::GraphApiClient;
use crate::errors::{ApiError, ResultExt};
use crate::identifiers::{self, IdentifierKind};
use crate::models::{
    AdAccount, AudiencePage, CreatedNode, CustomAudience, SharedAccountPage, SuccessResponse,
    UploadSummary, UsersUploadResponse,
};
use phonenumber::country::Id as CountryId;
use serde_json::json;

/// Fields requested when the caller doesn't name any.
const DEFAULT_AUDIENCE_FIELDS: &[&str] = &[
    "id",
    "name",
    "description",
    "subtype",
    "approximate_count",
    "operation_status",
    "time_created",
    "time_updated",
];

/// Parameters for creating a custom audience.
#[derive(Debug, Clone)]
pub struct CreateAudienceParams {
    pub name: String,
    pub description: Option<String>,
    /// Provenance declaration the platform requires for uploaded files,
    /// e.g. "USER_PROVIDED_ONLY".
    pub customer_file_source: Option<String>,
}

impl CreateAudienceParams {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            customer_file_source: None,
        }
    }
}

/// Parameters for listing an account's audiences.
#[derive(Debug, Clone, Default)]
pub struct ListParams {
    /// Fields to request; defaults to the standard set.
    pub fields: Option<Vec<String>>,
    /// Page size.
    pub limit: Option<u32>,
    /// Cursor from a previous page's `paging.cursors.after`.
    pub after: Option<String>,
}

enum UploadOp {
    Add,
    Remove,
}

/// Operations on custom audience nodes: lifecycle, membership, sharing.
pub struct CustomAudienceService<'a> {
    client: &'a GraphApiClient,
    phone_region: CountryId,
}

impl<'a> CustomAudienceService<'a> {
    pub fn new(client: &'a GraphApiClient) -> Self {
        Self {
            client,
            phone_region: CountryId::US,
        }
    }

    /// Default region used to parse phone numbers that aren't in E.164.
    pub fn with_phone_region(mut self, region: CountryId) -> Self {
        self.phone_region = region;
        self
    }

    /// Creates a custom audience under an ad account and returns its id.
    pub async fn create(
        &self,
        account: &AdAccount,
        params: &CreateAudienceParams,
    ) -> Result<String, ApiError> {
        let name = params.name.trim();
        if name.is_empty() {
            return Err(ApiError::BadRequest(
                "Audience name cannot be empty".to_string(),
            ));
        }

        tracing::info!(
            "Creating custom audience '{}' under {}",
            name,
            account.node_id()
        );

        let mut form = vec![
            ("name".to_string(), name.to_string()),
            ("subtype".to_string(), "CUSTOM".to_string()),
        ];
        if let Some(ref description) = params.description {
            form.push(("description".to_string(), description.clone()));
        }
        if let Some(ref source) = params.customer_file_source {
            form.push(("customer_file_source".to_string(), source.clone()));
        }

        let created: CreatedNode = self
            .client
            .post_form(&format!("{}/customaudiences", account.node_id()), &form)
            .await
            .context(format!("Creating audience '{}'", name))?;

        tracing::info!("Custom audience created: {}", created.id);
        Ok(created.id)
    }

    /// Reads one audience node.
    pub async fn get(
        &self,
        audience_id: &str,
        fields: Option<&[&str]>,
    ) -> Result<CustomAudience, ApiError> {
        let fields = fields.unwrap_or(DEFAULT_AUDIENCE_FIELDS).join(",");
        self.client
            .get(audience_id, &[("fields".to_string(), fields)])
            .await
    }

    /// Lists an account's custom audiences, one page at a time.
    pub async fn list(
        &self,
        account: &AdAccount,
        params: &ListParams,
    ) -> Result<AudiencePage, ApiError> {
        let fields = match params.fields {
            Some(ref fields) => fields.join(","),
            None => DEFAULT_AUDIENCE_FIELDS.join(","),
        };

        let mut query = vec![("fields".to_string(), fields)];
        if let Some(limit) = params.limit {
            query.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(ref after) = params.after {
            query.push(("after".to_string(), after.clone()));
        }

        self.client
            .get(&format!("{}/customaudiences", account.node_id()), &query)
            .await
    }

    /// Deletes an audience node.
    pub async fn delete(&self, audience_id: &str) -> Result<(), ApiError> {
        tracing::info!("Deleting custom audience {}", audience_id);

        let response: SuccessResponse = self.client.delete_form(audience_id, &[]).await?;
        if !response.success {
            return Err(ApiError::ExternalApiError(format!(
                "Deletion of audience {} was not acknowledged",
                audience_id
            )));
        }
        Ok(())
    }

    /// Adds members to an audience.
    ///
    /// Raw identifiers are normalized and hashed client-side, then uploaded
    /// sequentially in chunks of at most 10,000. Every chunk's receipt is
    /// folded into the returned summary; a chunk failure aborts the loop
    /// with the chunk position and progress so far in the error context.
    pub async fn add_users(
        &self,
        audience_id: &str,
        kind: IdentifierKind,
        raw_identifiers: &[String],
    ) -> Result<UploadSummary, ApiError> {
        self.upload(audience_id, kind, raw_identifiers, UploadOp::Add)
            .await
    }

    /// Removes members from an audience. Same pipeline as [`Self::add_users`].
    pub async fn remove_users(
        &self,
        audience_id: &str,
        kind: IdentifierKind,
        raw_identifiers: &[String],
    ) -> Result<UploadSummary, ApiError> {
        self.upload(audience_id, kind, raw_identifiers, UploadOp::Remove)
            .await
    }

    async fn upload(
        &self,
        audience_id: &str,
        kind: IdentifierKind,
        raw_identifiers: &[String],
        op: UploadOp,
    ) -> Result<UploadSummary, ApiError> {
        let (entries, skipped) =
            identifiers::prepare_batch(kind, raw_identifiers, self.phone_region);

        if entries.is_empty() {
            return Err(ApiError::BadRequest(format!(
                "No valid {} identifiers to upload ({} skipped)",
                kind.schema(),
                skipped
            )));
        }
        if skipped > 0 {
            tracing::warn!(
                "{} of {} identifiers skipped during normalization",
                skipped,
                raw_identifiers.len()
            );
        }

        let path = format!("{}/users", audience_id);
        let chunks = identifiers::chunk_entries(&entries);
        let total_chunks = chunks.len();
        let mut summary = UploadSummary::new(skipped);

        for (index, chunk) in chunks.into_iter().enumerate() {
            let payload = json!({
                "schema": kind.schema(),
                "data": chunk,
            })
            .to_string();
            let form = vec![("payload".to_string(), payload)];

            tracing::info!(
                "Uploading chunk {}/{} ({} entries) to audience {}",
                index + 1,
                total_chunks,
                chunk.len(),
                audience_id
            );

            let response: UsersUploadResponse = match op {
                UploadOp::Add => self.client.post_form(&path, &form).await,
                UploadOp::Remove => self.client.delete_form(&path, &form).await,
            }
            .with_context(|| {
                format!(
                    "Chunk {}/{} failed ({} entries received before failure)",
                    index + 1,
                    total_chunks,
                    summary.num_received
                )
            })?;

            summary.absorb(chunk.len(), response);
        }

        tracing::info!(
            "Audience {} upload complete: {} entries in {} chunks, {} received, {} invalid",
            audience_id,
            summary.entries_sent,
            summary.chunks_sent,
            summary.num_received,
            summary.num_invalid_entries
        );

        Ok(summary)
    }

    /// Shares an audience with other ad accounts.
    pub async fn share(
        &self,
        audience_id: &str,
        accounts: &[AdAccount],
    ) -> Result<(), ApiError> {
        let form = share_list_form(accounts)?;

        tracing::info!(
            "Sharing audience {} with {} account(s)",
            audience_id,
            accounts.len()
        );

        let response: SuccessResponse = self
            .client
            .post_form(&format!("{}/adaccounts", audience_id), &form)
            .await
            .context(format!("Sharing audience {}", audience_id))?;

        if !response.success {
            return Err(ApiError::ExternalApiError(format!(
                "Sharing of audience {} was not acknowledged",
                audience_id
            )));
        }
        Ok(())
    }

    /// Revokes other ad accounts' access to an audience.
    pub async fn unshare(
        &self,
        audience_id: &str,
        accounts: &[AdAccount],
    ) -> Result<(), ApiError> {
        let form = share_list_form(accounts)?;

        tracing::info!(
            "Unsharing audience {} from {} account(s)",
            audience_id,
            accounts.len()
        );

        let response: SuccessResponse = self
            .client
            .delete_form(&format!("{}/adaccounts", audience_id), &form)
            .await
            .context(format!("Unsharing audience {}", audience_id))?;

        if !response.success {
            return Err(ApiError::ExternalApiError(format!(
                "Unsharing of audience {} was not acknowledged",
                audience_id
            )));
        }
        Ok(())
    }

    /// Lists the ad accounts an audience has been shared with.
    pub async fn shared_accounts(
        &self,
        audience_id: &str,
    ) -> Result<SharedAccountPage, ApiError> {
        self.client
            .get(&format!("{}/adaccounts", audience_id), &[])
            .await
    }
}

/// The share edge wants bare numeric ids as a JSON array.
fn share_list_form(accounts: &[AdAccount]) -> Result<Vec<(String, String)>, ApiError> {
    if accounts.is_empty() {
        return Err(ApiError::BadRequest(
            "No ad accounts in share list".to_string(),
        ));
    }

    let ids: Vec<&str> = accounts.iter().map(|a| a.bare_id()).collect();
    let encoded = serde_json::to_string(&ids)
        .map_err(|e| ApiError::InternalError(format!("Failed to encode share list: {}", e)))?;

    Ok(vec![("adaccounts".to_string(), encoded)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_share_list_form_uses_bare_ids() {
        let accounts = vec![
            AdAccount::new("act_111").unwrap(),
            AdAccount::new("222").unwrap(),
        ];
        let form = share_list_form(&accounts).unwrap();

        assert_eq!(form.len(), 1);
        assert_eq!(form[0].0, "adaccounts");
        assert_eq!(form[0].1, r#"["111","222"]"#);
    }

    #[test]
    fn test_share_list_form_rejects_empty() {
        assert!(share_list_form(&[]).is_err());
    }
}
