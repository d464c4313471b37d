//! Outbound notification collaborator.
//!
//! The lifecycle manager only ever talks to the [`Notifier`] trait: every
//! call is opaque send-and-confirm or send-and-fail. Dispatch runs after the
//! state mutation has been persisted, and a failure never rolls the
//! transition back (registration is the one exception, handled by the
//! caller). The shipped [`LogNotifier`] writes the dispatch to the log in
//! place of a real mail relay.

use async_trait::async_trait;
use tracing::info;

use crate::auth::User;
use crate::queries::Query;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_verification_code(
        &self,
        email: &str,
        name: &str,
        code: &str,
    ) -> anyhow::Result<()>;

    async fn send_assignment_notice(&self, query: &Query, team_head: &User) -> anyhow::Result<()>;

    async fn send_resolution_notice(&self, query: &Query, recipient: &User) -> anyhow::Result<()>;

    async fn send_dismantle_notice(
        &self,
        query: &Query,
        recipient: &User,
        actor: &User,
    ) -> anyhow::Result<()>;
}

pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_verification_code(
        &self,
        email: &str,
        name: &str,
        code: &str,
    ) -> anyhow::Result<()> {
        info!(%email, %name, %code, "verification code dispatched");
        Ok(())
    }

    async fn send_assignment_notice(&self, query: &Query, team_head: &User) -> anyhow::Result<()> {
        info!(
            query_id = %query.id,
            title = %query.title,
            to = %team_head.email,
            "assignment notice dispatched"
        );
        Ok(())
    }

    async fn send_resolution_notice(&self, query: &Query, recipient: &User) -> anyhow::Result<()> {
        info!(
            query_id = %query.id,
            title = %query.title,
            to = %recipient.email,
            "resolution notice dispatched"
        );
        Ok(())
    }

    async fn send_dismantle_notice(
        &self,
        query: &Query,
        recipient: &User,
        actor: &User,
    ) -> anyhow::Result<()> {
        info!(
            query_id = %query.id,
            title = %query.title,
            to = %recipient.email,
            by = %actor.name,
            "dismantle notice dispatched"
        );
        Ok(())
    }
}
