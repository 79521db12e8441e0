//! Resource commands: list, create, update, delete.

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use portal_core::api::Collection;
use portal_core::{FetchOptions, PortalClient};

/// Every resource the CLI can address, by its command-line name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "kebab-case")]
pub enum Resource {
    Members,
    MemberActivities,
    Evaluations,
    Announcements,
    CalendarEvents,
    RuleModifications,
    Newsletters,
    Resources,
    PublicNews,
    PublicTraining,
    PublicResources,
    PublicPages,
    Officials,
    ExecutiveTeam,
}

impl Resource {
    pub const ALL: [Resource; 14] = [
        Resource::Members,
        Resource::MemberActivities,
        Resource::Evaluations,
        Resource::Announcements,
        Resource::CalendarEvents,
        Resource::RuleModifications,
        Resource::Newsletters,
        Resource::Resources,
        Resource::PublicNews,
        Resource::PublicTraining,
        Resource::PublicResources,
        Resource::PublicPages,
        Resource::Officials,
        Resource::ExecutiveTeam,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Resource::Members => "members",
            Resource::MemberActivities => "member-activities",
            Resource::Evaluations => "evaluations",
            Resource::Announcements => "announcements",
            Resource::CalendarEvents => "calendar-events",
            Resource::RuleModifications => "rule-modifications",
            Resource::Newsletters => "newsletters",
            Resource::Resources => "resources",
            Resource::PublicNews => "public-news",
            Resource::PublicTraining => "public-training",
            Resource::PublicResources => "public-resources",
            Resource::PublicPages => "public-pages",
            Resource::Officials => "officials",
            Resource::ExecutiveTeam => "executive-team",
        }
    }
}

/// Member or evaluator a list or delete is scoped to.
#[derive(Debug, Clone, Default, Args)]
pub struct Scope {
    /// Scope activities or evaluations to a member
    #[arg(long = "member", value_name = "ID")]
    pub member_id: Option<String>,

    /// Scope evaluations to an evaluator
    #[arg(long = "evaluator", value_name = "ID")]
    pub evaluator_id: Option<String>,
}

/// Flags for `list`.
#[derive(Debug, Clone, Default, Args)]
pub struct Filters {
    /// Bypass the cache for this read
    #[arg(long)]
    pub refresh: bool,

    #[command(flatten)]
    pub scope: Scope,

    /// Featured resources only
    #[arg(long)]
    pub featured: bool,

    /// Include inactive executive members
    #[arg(long)]
    pub all: bool,

    /// Active items only, for resources that have an active flag
    #[arg(long)]
    pub active: bool,
}

impl Filters {
    fn options(&self) -> FetchOptions {
        if self.refresh {
            FetchOptions::refresh()
        } else {
            FetchOptions::default()
        }
    }
}

fn to_json<T: Serialize>(value: T) -> Result<Value> {
    serde_json::to_value(value).context("Failed to serialize response")
}

fn parse<T: DeserializeOwned>(resource: Resource, json: &str) -> Result<T> {
    serde_json::from_str(json).with_context(|| format!("Invalid {} JSON", resource.name()))
}

async fn list_collection<T>(collection: Collection<'_, T>, filters: &Filters) -> Result<Value>
where
    T: Serialize + DeserializeOwned,
{
    to_json(collection.get_all(filters.options()).await?)
}

async fn list_active<T>(collection: Collection<'_, T>, filters: &Filters) -> Result<Value>
where
    T: Serialize + DeserializeOwned + portal_core::models::Active,
{
    if filters.active {
        to_json(collection.get_active().await?)
    } else {
        list_collection(collection, filters).await
    }
}

pub async fn list(client: &PortalClient, resource: Resource, filters: &Filters) -> Result<Value> {
    let options = filters.options();
    match resource {
        Resource::Members => to_json(client.members().get_all(options).await?),
        Resource::MemberActivities => to_json(
            client
                .member_activities()
                .get_all(filters.scope.member_id.as_deref(), options)
                .await?,
        ),
        Resource::Evaluations => {
            let api = client.evaluations();
            let items = match (&filters.scope.member_id, &filters.scope.evaluator_id) {
                (Some(id), _) => api.get_by_member(id, options).await?,
                (None, Some(id)) => api.get_by_evaluator(id, options).await?,
                (None, None) => api.get_all(options).await?,
            };
            to_json(items)
        }
        Resource::Announcements => list_collection(client.announcements(), filters).await,
        Resource::CalendarEvents => list_collection(client.calendar_events(), filters).await,
        Resource::RuleModifications => list_collection(client.rule_modifications(), filters).await,
        Resource::Newsletters => list_collection(client.newsletters(), filters).await,
        Resource::Resources => to_json(client.resources().get_all(filters.featured, options).await?),
        Resource::PublicNews => list_active(client.public_news(), filters).await,
        Resource::PublicTraining => list_active(client.public_training(), filters).await,
        Resource::PublicResources => list_active(client.public_resources(), filters).await,
        Resource::PublicPages => to_json(client.public_pages().get_all(options).await?),
        Resource::Officials => list_active(client.officials(), filters).await,
        Resource::ExecutiveTeam if filters.all => to_json(
            client
                .executive_team()
                .get_all_including_inactive(options)
                .await?,
        ),
        Resource::ExecutiveTeam => list_active(client.executive_team(), filters).await,
    }
}

pub async fn create(client: &PortalClient, resource: Resource, json: &str) -> Result<Value> {
    match resource {
        Resource::Members => to_json(client.members().create(&parse(resource, json)?).await?),
        Resource::MemberActivities => to_json(
            client
                .member_activities()
                .create(&parse(resource, json)?)
                .await?,
        ),
        Resource::Evaluations => to_json(client.evaluations().create(&parse(resource, json)?).await?),
        Resource::Announcements => to_json(client.announcements().create(&parse(resource, json)?).await?),
        Resource::CalendarEvents => to_json(client.calendar_events().create(&parse(resource, json)?).await?),
        Resource::RuleModifications => {
            to_json(client.rule_modifications().create(&parse(resource, json)?).await?)
        }
        Resource::Newsletters => to_json(client.newsletters().create(&parse(resource, json)?).await?),
        Resource::Resources => to_json(client.resources().create(&parse(resource, json)?).await?),
        Resource::PublicNews => to_json(client.public_news().create(&parse(resource, json)?).await?),
        Resource::PublicTraining => to_json(client.public_training().create(&parse(resource, json)?).await?),
        Resource::PublicResources => to_json(client.public_resources().create(&parse(resource, json)?).await?),
        Resource::Officials => to_json(client.officials().create(&parse(resource, json)?).await?),
        Resource::ExecutiveTeam => to_json(client.executive_team().create(&parse(resource, json)?).await?),
        Resource::PublicPages => bail!("public-pages can only be updated"),
    }
}

/// Send `json` as a partial update: only the fields it names are written.
pub async fn update(client: &PortalClient, resource: Resource, id: &str, json: &str) -> Result<Value> {
    let changes: Value = parse(resource, json)?;
    if !changes.is_object() {
        bail!("Update for {} must be a JSON object", resource.name());
    }
    let changes = &changes;
    match resource {
        Resource::Members => to_json(client.members().update(id, changes).await?),
        Resource::MemberActivities => to_json(client.member_activities().update(id, changes).await?),
        Resource::Evaluations => to_json(client.evaluations().update(id, changes).await?),
        Resource::Announcements => to_json(client.announcements().update(id, changes).await?),
        Resource::CalendarEvents => to_json(client.calendar_events().update(id, changes).await?),
        Resource::RuleModifications => to_json(client.rule_modifications().update(id, changes).await?),
        Resource::Newsletters => to_json(client.newsletters().update(id, changes).await?),
        Resource::Resources => to_json(client.resources().update(id, changes).await?),
        Resource::PublicNews => to_json(client.public_news().update(id, changes).await?),
        Resource::PublicTraining => to_json(client.public_training().update(id, changes).await?),
        Resource::PublicResources => to_json(client.public_resources().update(id, changes).await?),
        Resource::PublicPages => to_json(client.public_pages().update(id, changes).await?),
        Resource::Officials => to_json(client.officials().update(id, changes).await?),
        Resource::ExecutiveTeam => to_json(client.executive_team().update(id, changes).await?),
    }
}

pub async fn delete(client: &PortalClient, resource: Resource, id: &str, scope: &Scope) -> Result<()> {
    match resource {
        Resource::Members => client.members().delete(id).await?,
        Resource::MemberActivities => {
            client
                .member_activities()
                .delete(id, scope.member_id.as_deref())
                .await?
        }
        Resource::Evaluations => {
            client
                .evaluations()
                .delete(id, scope.member_id.as_deref(), scope.evaluator_id.as_deref())
                .await?
        }
        Resource::Announcements => client.announcements().delete(id).await?,
        Resource::CalendarEvents => client.calendar_events().delete(id).await?,
        Resource::RuleModifications => client.rule_modifications().delete(id).await?,
        Resource::Newsletters => client.newsletters().delete(id).await?,
        Resource::Resources => client.resources().delete(id).await?,
        Resource::PublicNews => client.public_news().delete(id).await?,
        Resource::PublicTraining => client.public_training().delete(id).await?,
        Resource::PublicResources => client.public_resources().delete(id).await?,
        Resource::Officials => client.officials().delete(id).await?,
        Resource::ExecutiveTeam => client.executive_team().delete(id).await?,
        Resource::PublicPages => bail!("public-pages can only be updated"),
    }
    Ok(())
}
