use crate::client::GraphApiClient;
use crate::errors::{ApiError, ResultExt};
use crate::models::{AdAccount, CreatedNode, LookalikeSpec};

/// Parameters for deriving a lookalike audience from an existing one.
#[derive(Debug, Clone)]
pub struct CreateLookalikeParams {
    pub name: String,
    /// Custom audience the platform models the lookalike on.
    pub origin_audience_id: String,
    pub spec: LookalikeSpec,
}

/// Creation of lookalike audiences.
///
/// Lookalikes are custom audiences with `subtype=LOOKALIKE`; the platform
/// populates them from the origin audience, so there is no member upload.
pub struct LookalikeService<'a> {
    client: &'a GraphApiClient,
}

impl<'a> LookalikeService<'a> {
    pub fn new(client: &'a GraphApiClient) -> Self {
        Self { client }
    }

    /// Creates a lookalike audience under an ad account and returns its id.
    pub async fn create(
        &self,
        account: &AdAccount,
        params: &CreateLookalikeParams,
    ) -> Result<String, ApiError> {
        let name = params.name.trim();
        if name.is_empty() {
            return Err(ApiError::BadRequest(
                "Lookalike audience name cannot be empty".to_string(),
            ));
        }
        if params.origin_audience_id.trim().is_empty() {
            return Err(ApiError::BadRequest(
                "Lookalike requires an origin audience id".to_string(),
            ));
        }
        params.spec.validate()?;

        let spec_json = serde_json::to_string(&params.spec).map_err(|e| {
            ApiError::InternalError(format!("Failed to encode lookalike spec: {}", e))
        })?;

        tracing::info!(
            "Creating lookalike audience '{}' from {} under {} (country {}, ratio {})",
            name,
            params.origin_audience_id,
            account.node_id(),
            params.spec.country,
            params.spec.ratio
        );

        let form = vec![
            ("name".to_string(), name.to_string()),
            ("subtype".to_string(), "LOOKALIKE".to_string()),
            (
                "origin_audience_id".to_string(),
                params.origin_audience_id.trim().to_string(),
            ),
            ("lookalike_spec".to_string(), spec_json),
        ];

        let created: CreatedNode = self
            .client
            .post_form(&format!("{}/customaudiences", account.node_id()), &form)
            .await
            .context(format!("Creating lookalike '{}'", name))?;

        tracing::info!("Lookalike audience created: {}", created.id);
        Ok(created.id)
    }
}
