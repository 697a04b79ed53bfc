//! Server-less "say" command

use std::error::Error;
use std::io::{self, Write};
use std::sync::Arc;

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::cli::{join_loader, Workspace};
use crate::core::chat_handler::{ChatHandler, ChatSettings, ChatSubmission};
use crate::core::config::data::Defaults;
use crate::core::model::service::ModelService;
use crate::core::model::GenerationParams;
use crate::core::persona::{PersonaSelection, PersonaStore};

pub struct SayOptions {
    pub prompt: Vec<String>,
    pub persona: Option<String>,
    pub use_local_model: bool,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub token: Option<String>,
}

impl SayOptions {
    /// Fill unset parameters from the configured defaults.
    pub fn params(&self, defaults: &Defaults) -> GenerationParams {
        GenerationParams {
            max_tokens: self.max_tokens.unwrap_or(defaults.max_tokens),
            temperature: self.temperature.unwrap_or(defaults.temperature),
            top_p: self.top_p.unwrap_or(defaults.top_p),
        }
    }
}

pub async fn run_say(workspace: Workspace, options: SayOptions) -> Result<(), Box<dyn Error>> {
    let prompt = options.prompt.join(" ");
    if prompt.trim().is_empty() {
        eprintln!("Usage: agora say <prompt>");
        std::process::exit(1);
    }

    let config = workspace.config;
    let params = options.params(&config.defaults);
    config.parameters.validate(&params)?;

    let personas = Arc::new(PersonaStore::load_from_path(&workspace.personas_path)?);
    let service = Arc::new(ModelService::new(&config));
    let cancel = CancellationToken::new();
    let loader = options
        .use_local_model
        .then(|| service.start(cancel.clone()));

    let handler = ChatHandler::new(service, personas, ChatSettings::from_config(&config));
    let reply = handler.respond(ChatSubmission {
        message: prompt,
        history: Vec::new(),
        selection: options
            .persona
            .as_deref()
            .map(PersonaSelection::from_gallery_item),
        params,
        use_local_model: options.use_local_model,
        auth_token: options.token,
    });

    let mut chunks = reply.chunks;
    let mut stdout = io::stdout();
    while let Some(chunk) = chunks.next().await {
        print!("{chunk}");
        stdout.flush()?;
    }
    println!();

    cancel.cancel();
    if let Some(loader) = loader {
        join_loader(loader).await;
    }
    Ok(())
}
