//! Data models for portal resources.
//!
//! Every model tolerates missing columns (`#[serde(default)]`) and keeps
//! columns it does not know about in `extra`, so a cached row serialises
//! back exactly as the server sent it.
//!
//! - `portal`: announcements, calendar events, rule modifications, newsletters, resources
//! - `member`: members and their activity log
//! - `evaluation`: uploaded game evaluations
//! - `public`: public-site news, training, resources, pages, officials, executive team

pub mod evaluation;
pub mod member;
pub mod portal;
pub mod public;

pub use evaluation::{Evaluation, PersonRef};
pub use member::{Member, MemberActivity};
pub use portal::{Announcement, CalendarEvent, Newsletter, Resource, RuleModification};
pub use public::{
    ExecutiveMember, Official, PublicNewsItem, PublicPage, PublicResource, PublicTrainingEvent,
};

/// Public content that can be hidden without being deleted.
pub trait Active {
    fn is_active(&self) -> bool;
}

/// Public content addressable by URL slug.
pub trait Slugged {
    fn slug(&self) -> &str;
}

macro_rules! impl_active {
    ($($ty:ty),* $(,)?) => {
        $(impl Active for $ty {
            fn is_active(&self) -> bool {
                self.active
            }
        })*
    };
}

macro_rules! impl_slugged {
    ($($ty:ty),* $(,)?) => {
        $(impl Slugged for $ty {
            fn slug(&self) -> &str {
                &self.slug
            }
        })*
    };
}

impl_active!(
    PublicNewsItem,
    PublicTrainingEvent,
    PublicResource,
    Official,
    ExecutiveMember,
);

impl_slugged!(PublicNewsItem, PublicTrainingEvent, PublicResource);
