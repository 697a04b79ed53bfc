use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::{join_loader, Workspace};
use crate::core::chat_handler::{ChatHandler, ChatSettings};
use crate::core::config::data::path_display;
use crate::core::model::service::ModelService;
use crate::core::persona::PersonaStore;
use crate::server::{serve, AppState};
use crate::utils::logging::TranscriptLog;

pub async fn run_serve(
    workspace: Workspace,
    bind: Option<String>,
    log: Option<PathBuf>,
) -> Result<(), Box<dyn Error>> {
    let Workspace {
        config,
        config_path,
        personas_path,
    } = workspace;

    let personas = Arc::new(PersonaStore::load_from_path(&personas_path)?);
    if personas.is_empty() {
        warn!(
            path = %path_display(&personas_path),
            "no personas loaded; replies will use an empty system prompt"
        );
    }
    info!(
        config = %path_display(&config_path),
        personas = personas.list().len(),
        "configuration loaded"
    );

    let transcript = log.map(TranscriptLog::open).transpose()?.map(Arc::new);
    if let Some(log) = &transcript {
        info!(path = %path_display(log.path()), "writing transcript");
    }

    let service = Arc::new(ModelService::new(&config));
    let cancel = CancellationToken::new();
    let loader = service.start(cancel.clone());

    let handler = ChatHandler::new(
        service.clone(),
        personas,
        ChatSettings::from_config(&config),
    );
    let bind = bind.unwrap_or_else(|| config.server.bind.clone());
    let state = AppState {
        handler,
        manager: service,
        config: Arc::new(config),
        transcript,
    };

    let result = serve(state, &bind, cancel.clone()).await;
    cancel.cancel();
    join_loader(loader).await;
    result
}
