//! Shared Application State
//!
//! This module defines the `AppState` struct, which holds everything the
//! handlers and lesson sessions share: configuration, the response bank,
//! the credential store and the completion client built from the live
//! credential.

use crate::config::Config;
use anyhow::Context;
use island_core::{
    credential::{Credential, CredentialStore, CredentialStoreError, Provider},
    llm_client::{CompletionClient, CompletionSettings, OpenAICompatibleClient},
    response_bank::ResponseBank,
    roster::Roster,
    sequencer::LessonSequencer,
    session::{LessonSession, Pacing},
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// The client for the credential currently in force.
#[derive(Clone)]
struct LiveCompletion {
    provider: Provider,
    client: Arc<dyn CompletionClient>,
}

/// The shared application state, created once at startup and passed to all handlers.
pub struct AppState {
    pub config: Arc<Config>,
    pub roster: Roster,
    pub bank: Arc<ResponseBank>,
    pub settings: CompletionSettings,
    pub credential_store: Arc<dyn CredentialStore>,
    live: RwLock<Option<LiveCompletion>>,
}

fn connect(credential: &Credential, settings: &CompletionSettings) -> Option<LiveCompletion> {
    match OpenAICompatibleClient::new(credential, settings.clone()) {
        Ok(client) => Some(LiveCompletion {
            provider: credential.provider(),
            client: Arc::new(client),
        }),
        Err(e) => {
            warn!(error = %e, provider = %credential.provider(), "Could not build completion client");
            None
        }
    }
}

impl AppState {
    /// Builds the state and picks up any credential already on disk.
    pub fn new(
        config: Config,
        bank: ResponseBank,
        settings: CompletionSettings,
        credential_store: Arc<dyn CredentialStore>,
    ) -> Result<Self, CredentialStoreError> {
        let live = match credential_store.load()? {
            Some(credential) => {
                info!(provider = %credential.provider(), "Loaded stored AI credential");
                connect(&credential, &settings)
            }
            None => {
                info!("No stored AI credential; lessons will use scripted replies");
                None
            }
        };
        Ok(Self {
            config: Arc::new(config),
            roster: Roster::desert_island(),
            bank: Arc::new(bank),
            settings,
            credential_store,
            live: RwLock::new(live),
        })
    }

    pub async fn credential_provider(&self) -> Option<Provider> {
        self.live.read().await.as_ref().map(|live| live.provider)
    }

    pub async fn completion_client(&self) -> Option<Arc<dyn CompletionClient>> {
        self.live
            .read()
            .await
            .as_ref()
            .map(|live| Arc::clone(&live.client))
    }

    /// Persists `credential` and makes it the live one. Sessions pick it up
    /// on their next end-user message.
    pub async fn replace_credential(&self, credential: Credential) -> anyhow::Result<()> {
        let store = Arc::clone(&self.credential_store);
        let to_save = credential.clone();
        tokio::task::spawn_blocking(move || store.save(&to_save))
            .await
            .context("Credential save task failed")??;
        let live = connect(&credential, &self.settings);
        *self.live.write().await = live;
        info!(provider = %credential.provider(), "AI credential updated");
        Ok(())
    }

    /// A fresh lesson with its own RNG and this deployment's pacing.
    pub fn new_session(&self, client: Option<Arc<dyn CompletionClient>>) -> LessonSession {
        let sequencer = LessonSequencer::new(
            self.roster.clone(),
            Arc::clone(&self.bank),
            StdRng::from_os_rng(),
        );
        let mut session = LessonSession::new(sequencer, Pacing::scaled(self.config.pacing_scale));
        session.set_completion_client(client);
        session
    }
}
