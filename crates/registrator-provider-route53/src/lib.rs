// # Route 53 Record Store
//
// This crate provides the AWS Route 53 implementation of `RecordStore`.
//
// ## Behaviour
//
// - `find_by_name` lists the hosted zone starting at the requested name and
//   follows pagination until the name no longer matches
// - `apply` submits one change batch holding exactly one change
// - A delete copies the TTL, weight and type of the stored set it removes.
//   Route 53 only deletes an exact match, and those fields may have been
//   written under a different configuration
// - Service rejections become `Error::Provider { code, message }`, every
//   other SDK failure becomes `Error::Transport`
// - NO retry logic (a failed event is reported and the next event proceeds)
// - NO caching (the zone is the source of truth and is queried every time)
//
// ## Dry-Run Mode
//
// Queries run against the live zone, changes are logged and acknowledged
// with a synthetic change id instead of being submitted.
//
// ## API Reference
//
// - ListResourceRecordSets: `GET /2013-04-01/hostedzone/{Id}/rrset`
// - ChangeResourceRecordSets: `POST /2013-04-01/hostedzone/{Id}/rrset`

use async_trait::async_trait;
use aws_sdk_route53::Client;
use aws_sdk_route53::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_route53::types::{
    Change, ChangeAction as SdkChangeAction, ChangeBatch, ResourceRecord,
    ResourceRecordSet as SdkRecordSet, RrType,
};
use registrator_core::config::{ProviderConfig, RecordConfig};
use registrator_core::traits::{
    ChangeAck, ChangeAction, RecordStore, RecordType, RegistrationTarget, ResourceRecordSet,
    names_match,
};
use registrator_core::{Error, Result};

/// Change id reported for changes skipped in dry-run mode
pub const DRY_RUN_CHANGE_ID: &str = "/change/DRYRUN";

/// Route 53 backed record store
pub struct Route53RecordStore {
    /// SDK client (credentials come from the default provider chain)
    client: Client,

    /// Shape of the record sets written
    record: RecordConfig,

    /// Dry-run mode: if true, query the zone but never submit changes
    dry_run: bool,
}

// The SDK client carries resolved credentials; keep them out of logs
impl std::fmt::Debug for Route53RecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route53RecordStore")
            .field("client", &"<aws-sdk-route53>")
            .field("record", &self.record)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl Route53RecordStore {
    /// Create a store around an existing SDK client
    pub fn new(client: Client, record: RecordConfig, dry_run: bool) -> Self {
        Self {
            client,
            record,
            dry_run,
        }
    }

    /// Create a store that submits changes
    pub fn new_live(client: Client, record: RecordConfig) -> Self {
        Self::new(client, record, false)
    }

    /// Create a store that only logs the changes it would submit
    pub fn new_dry_run(client: Client, record: RecordConfig) -> Self {
        Self::new(client, record, true)
    }

    /// Build a store from the provider configuration
    ///
    /// Loads credentials from the default AWS provider chain (environment,
    /// profile, instance role) for the configured region.
    pub async fn from_config(provider: &ProviderConfig, record: RecordConfig) -> Result<Self> {
        let (region, dry_run) = match provider {
            ProviderConfig::Route53 { region, dry_run } => (region.clone(), *dry_run),
            other => {
                return Err(Error::config(format!(
                    "Route 53 store cannot be built from a '{}' provider config",
                    other.type_name()
                )));
            }
        };

        let shared = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.clone()))
            .load()
            .await;

        if dry_run {
            tracing::warn!("Route 53 store running in DRY-RUN mode - no changes will be made");
        }
        tracing::debug!(region = %region, "Route 53 client configured");

        Ok(Self::new(Client::new(&shared), record, dry_run))
    }

    /// Whether changes are skipped
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// The stored set a delete of `target` has to match
    ///
    /// Falls back to the configured shape when the zone holds no counterpart,
    /// letting Route 53 report the rejection.
    async fn set_to_delete(
        &self,
        zone_id: &str,
        target: &RegistrationTarget,
    ) -> Result<ResourceRecordSet> {
        let wanted = ResourceRecordSet::for_target(target, &self.record);
        let stored = self.find_by_name(zone_id, target.record_name()).await?;

        match stored_counterpart(stored, &wanted) {
            Some(set) => {
                if set.ttl != wanted.ttl || set.weight != wanted.weight {
                    tracing::debug!(
                        record = %target,
                        stored_ttl = ?set.ttl,
                        stored_weight = ?set.weight,
                        "Deleting record set written with a different shape"
                    );
                }
                Ok(set)
            }
            None => Ok(wanted),
        }
    }
}

#[async_trait]
impl RecordStore for Route53RecordStore {
    async fn find_by_name(&self, zone_id: &str, name: &str) -> Result<Vec<ResourceRecordSet>> {
        // Route 53 lists in name order, so every set for `name` sits at the
        // front of a listing that starts there
        let mut start_name = Some(start_record_name(name));
        let mut start_type: Option<RrType> = None;
        let mut start_identifier: Option<String> = None;
        let mut matches = Vec::new();

        loop {
            let page = self
                .client
                .list_resource_record_sets()
                .hosted_zone_id(zone_id)
                .set_start_record_name(start_name.take())
                .set_start_record_type(start_type.take())
                .set_start_record_identifier(start_identifier.take())
                .send()
                .await
                .map_err(classify_sdk_error)?;

            let mut passed_name = false;
            for set in page.resource_record_sets() {
                if names_match(set.name(), name) {
                    matches.push(from_sdk_record_set(set));
                } else {
                    passed_name = true;
                    break;
                }
            }

            if passed_name || !page.is_truncated() {
                break;
            }

            start_name = page.next_record_name().map(str::to_string);
            start_type = page.next_record_type().cloned();
            start_identifier = page.next_record_identifier().map(str::to_string);
            if start_name.is_none() {
                break;
            }
        }

        tracing::debug!(
            zone_id,
            name,
            found = matches.len(),
            "Listed record sets"
        );
        Ok(matches)
    }

    async fn apply(
        &self,
        zone_id: &str,
        action: ChangeAction,
        target: &RegistrationTarget,
    ) -> Result<ChangeAck> {
        let set = match action {
            ChangeAction::Create => ResourceRecordSet::for_target(target, &self.record),
            ChangeAction::Delete => self.set_to_delete(zone_id, target).await?,
        };
        let batch = build_change_batch(action, &set)?;

        if self.dry_run {
            tracing::info!(
                zone_id,
                action = %action,
                record = %target,
                record_type = %set.record_type,
                "[DRY-RUN] Would submit change"
            );
            return Ok(ChangeAck {
                id: DRY_RUN_CHANGE_ID.to_string(),
                status: "DRY_RUN".to_string(),
            });
        }

        let output = self
            .client
            .change_resource_record_sets()
            .hosted_zone_id(zone_id)
            .change_batch(batch)
            .send()
            .await
            .map_err(classify_sdk_error)?;

        let ack = output
            .change_info()
            .map(|info| ChangeAck {
                id: info.id().to_string(),
                status: info.status().as_str().to_string(),
            })
            .ok_or_else(|| Error::transport("Route 53 response carried no change info"))?;

        tracing::debug!(
            zone_id,
            change_id = %ack.id,
            status = %ack.status,
            "Change submitted"
        );
        Ok(ack)
    }

    fn provider_name(&self) -> &'static str {
        "route53"
    }
}

/// Map any SDK failure onto the registrator's error taxonomy
///
/// Every SDK call goes through this one function.
fn classify_sdk_error<E, R>(err: SdkError<E, R>) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    match &err {
        SdkError::ServiceError(service) => provider_error(service.err()),
        _ => Error::transport(format!("Route 53 request failed: {}", DisplayErrorContext(&err))),
    }
}

fn provider_error(err: &impl ProvideErrorMetadata) -> Error {
    Error::provider(
        err.code().unwrap_or("Unknown"),
        err.message().unwrap_or("no message from Route 53"),
    )
}

fn stored_counterpart(
    stored: Vec<ResourceRecordSet>,
    wanted: &ResourceRecordSet,
) -> Option<ResourceRecordSet> {
    stored
        .into_iter()
        .find(|set| set.set_identifier == wanted.set_identifier && set.value == wanted.value)
}

/// Listing start point: Route 53 stores names lowercased with the trailing dot
fn start_record_name(name: &str) -> String {
    format!("{}.", name.trim_end_matches('.').to_ascii_lowercase())
}

fn from_sdk_record_set(set: &SdkRecordSet) -> ResourceRecordSet {
    ResourceRecordSet {
        name: set.name().to_string(),
        record_type: RecordType::from(set.r#type().as_str()),
        value: set
            .resource_records()
            .first()
            .map(|record| record.value().to_string())
            .unwrap_or_default(),
        set_identifier: set.set_identifier().map(str::to_string),
        weight: set.weight(),
        ttl: set.ttl(),
    }
}

fn build_change_batch(action: ChangeAction, set: &ResourceRecordSet) -> Result<ChangeBatch> {
    let record = ResourceRecord::builder()
        .value(set.value.as_str())
        .build()
        .map_err(invalid_change)?;

    let record_set = SdkRecordSet::builder()
        .name(set.name.as_str())
        .r#type(RrType::from(set.record_type.as_str()))
        .resource_records(record)
        .set_set_identifier(set.set_identifier.clone())
        .set_weight(set.weight)
        .set_ttl(set.ttl)
        .build()
        .map_err(invalid_change)?;

    let sdk_action = match action {
        ChangeAction::Create => SdkChangeAction::Create,
        ChangeAction::Delete => SdkChangeAction::Delete,
    };

    let change = Change::builder()
        .action(sdk_action)
        .resource_record_set(record_set)
        .build()
        .map_err(invalid_change)?;

    ChangeBatch::builder()
        .comment(format!("registrator {} {}", action.as_str(), set.name))
        .changes(change)
        .build()
        .map_err(invalid_change)
}

fn invalid_change(err: impl std::fmt::Display) -> Error {
    Error::invalid_input(format!("Cannot build Route 53 change: {}", err))
}
