//! Command execution

use std::sync::Arc;

use anyhow::{Context, bail};
use serde::Serialize;

use liftwatch_core::{
    ApiClient, ApiResponse, Config, Credentials, DetailTab, ElevatorApi, ElevatorFleet, ElevatorStatus, Route, Session,
    StorageError, TokenStore,
};

use crate::args::Command;
use crate::output;

/// Wired-up client services for one invocation
pub struct App {
    session: Session,
    elevators: ElevatorApi,
    fleet: ElevatorFleet,
    json: bool,
}

/// Elevator plus its derived status, for `--json`
#[derive(Serialize)]
struct StatusRow<'a> {
    #[serde(flatten)]
    elevator: &'a liftwatch_core::Elevator,
    derived_status: Option<ElevatorStatus>,
}

impl App {
    /// Open the persistent token store and build the client stack
    ///
    /// With `discard_corrupt`, a session file that no longer parses is
    /// deleted and replaced by an empty one instead of failing.
    pub fn new(config: &Config, json: bool, discard_corrupt: bool) -> anyhow::Result<Self> {
        let storage_path = config.client.storage_path()?;
        let tokens = match TokenStore::open_file(&storage_path) {
            Ok(tokens) => tokens,
            Err(StorageError::CorruptFile { .. }) if discard_corrupt => {
                tracing::warn!("Session file {} is corrupted, discarding it", storage_path.display());
                TokenStore::reset_file(&storage_path)?
            }
            Err(e @ StorageError::CorruptFile { .. }) => {
                return Err(anyhow::Error::new(e).context(format!(
                    "Run `liftwatch logout` or delete {} to start a new session",
                    storage_path.display()
                )));
            }
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("Failed to open session store {}", storage_path.display())));
            }
        };
        tracing::debug!("Session store: {}", storage_path.display());

        Self::with_store(config, Arc::new(tokens), json)
    }

    pub fn with_store(config: &Config, tokens: Arc<TokenStore>, json: bool) -> anyhow::Result<Self> {
        let api = ApiClient::new(&config.client, tokens)?;
        let session = Session::new(api.clone()).with_verify_on_startup(config.client.verify_on_startup);

        Ok(Self {
            session,
            elevators: ElevatorApi::new(api),
            fleet: ElevatorFleet::demo(),
            json,
        })
    }

    /// Run one command and render its output
    ///
    /// If the server rejected the stored credential along the way, the
    /// session is cleared and a redirect notice is appended.
    pub async fn run(&mut self, command: Command) -> anyhow::Result<String> {
        let result = self.dispatch(command).await;

        match self.session.poll_events() {
            Some(route) => {
                let notice = format!("Session expired, redirecting to {}", route);
                match result {
                    Ok(out) if out.is_empty() => Ok(notice),
                    Ok(out) => Ok(format!("{}\n{}", out, notice)),
                    Err(e) => Err(e.context(notice)),
                }
            }
            None => result,
        }
    }

    async fn dispatch(&mut self, command: Command) -> anyhow::Result<String> {
        match command {
            Command::Login { username, password, role } => {
                let user = self.session.sign_in(&Credentials::new(username, password, role)).await?;
                Ok(format!("Signed in as {} ({})", user.username, user.role))
            }
            Command::Register { username, password, role } => {
                let response = self
                    .session
                    .auth()
                    .register(&Credentials::new(username, password, role))
                    .await?;
                if !response.success {
                    bail!(response.message.unwrap_or_else(|| "registration failed".to_string()));
                }
                Ok(response.message.unwrap_or_else(|| "Registered".to_string()))
            }
            Command::Logout => {
                self.sign_out().await;
                Ok("Signed out".to_string())
            }
            Command::Whoami => {
                self.session.restore().await?;
                let state = self.session.state();
                if self.json {
                    return Ok(serde_json::to_string_pretty(&state.user)?);
                }
                Ok(output::session_summary(&state))
            }
            Command::Elevators => {
                self.session.initialize_from_storage()?;
                let elevators = success_data(self.elevators.list().await?)?.unwrap_or_default();
                self.fleet.replace(elevators);
                self.render_fleet()
            }
            Command::Elevator { id } => {
                self.session.initialize_from_storage()?;
                let elevator =
                    success_data(self.elevators.get(id).await?)?.context("elevator response carried no data")?;
                if self.json {
                    return Ok(serde_json::to_string_pretty(&elevator)?);
                }
                Ok(output::elevator_detail(&elevator, DetailTab::Basic))
            }
            Command::Sensors { id } => {
                self.session.initialize_from_storage()?;
                let readings = success_data(self.elevators.sensors(id).await?)?.unwrap_or_default();
                if self.json {
                    return Ok(serde_json::to_string_pretty(&readings)?);
                }
                Ok(output::readings_table(&readings))
            }
            Command::Fleet => {
                self.fleet = ElevatorFleet::demo();
                self.render_fleet()
            }
            Command::Open { route } => {
                let Some(parsed) = Route::parse(&route) else {
                    bail!("unknown route: {}", route);
                };
                self.open(parsed).await
            }
        }
    }

    /// Resolve a route against the session and the local fleet
    async fn open(&mut self, route: Route) -> anyhow::Result<String> {
        match route {
            Route::Home => {
                if !self.session.restore().await? {
                    return Ok(format!("Not signed in, redirecting to {}", Route::SignIn));
                }
                Ok(output::session_summary(&self.session.state()))
            }
            Route::ElevatorList => self.render_fleet(),
            Route::ElevatorDetail { index, tab } => {
                let Some(elevator) = self.fleet.get(index) else {
                    bail!("no elevator at index {}", index);
                };
                Ok(output::elevator_detail(elevator, tab))
            }
            Route::SignIn => {
                self.session.initialize_from_storage()?;
                let state = self.session.state();
                if state.is_authenticated() {
                    return Ok(format!("Already signed in as {}", state.username()));
                }
                Ok("Sign in with: liftwatch login -u <username> -p <password>".to_string())
            }
            Route::SignOut => {
                self.sign_out().await;
                Ok(format!("Signed out, redirecting to {}", Route::SignIn))
            }
        }
    }

    /// Logout never fails locally: an unreadable stored session is still cleared
    async fn sign_out(&self) {
        if let Err(e) = self.session.initialize_from_storage() {
            tracing::warn!("Ignoring unreadable stored session: {}", e);
        }
        self.session.logout().await;
    }

    fn render_fleet(&self) -> anyhow::Result<String> {
        if self.json {
            let rows: Vec<StatusRow> = self
                .fleet
                .elevators()
                .iter()
                .map(|e| StatusRow {
                    elevator: e,
                    derived_status: e.derived_status(),
                })
                .collect();
            return Ok(serde_json::to_string_pretty(&rows)?);
        }
        Ok(output::elevator_table(self.fleet.elevators()))
    }
}

/// Payload of a successful envelope; a `success: false` one becomes an error
fn success_data<T>(response: ApiResponse<T>) -> anyhow::Result<Option<T>> {
    if !response.success {
        bail!(response.message.unwrap_or_else(|| "request was not successful".to_string()));
    }
    Ok(response.data)
}
