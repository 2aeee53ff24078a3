use std::sync::Arc;

use aurora_core::{
    ConversationController, ConversationHistory, GiphyClient, MessageFormatter, OpenRouterClient,
    SpotifyClient,
};
use tracing::info;

use crate::config::Config;
use crate::error::AuroraError;

pub type Formatter = MessageFormatter<Option<GiphyClient>, Option<SpotifyClient>>;
pub type Controller = ConversationController<OpenRouterClient>;

/// Everything a front-end needs to run a conversation.
pub struct Session {
    pub controller: Arc<Controller>,
    pub formatter: Arc<Formatter>,
}

/// Builds the formatter from whichever lookup services are configured.
pub fn build_formatter(config: &Config) -> Formatter {
    let media = config.giphy_key().map(GiphyClient::new);
    let tracks = config
        .spotify_credentials()
        .map(|(id, secret)| SpotifyClient::new(id, secret));

    info!(
        images = media.is_some(),
        music = tracks.is_some(),
        "lookup services configured"
    );

    MessageFormatter::new(media, tracks)
}

pub fn build_session(config: &Config, model: Option<String>) -> Result<Session, AuroraError> {
    let mut client = OpenRouterClient::new(config.api_key()?)
        .with_params(config.chat.params.clone())
        .with_app_identity(config.chat.referer.clone(), Some(config.title()));
    if let Some(model) = model.or_else(|| config.chat.model.clone()) {
        client = client.with_model(model);
    }

    info!(model = client.model(), "starting session");

    let history = ConversationHistory::new(config.system_prompt());
    let controller = ConversationController::new(client, history).with_typing_delay(config.typing_delay());

    Ok(Session {
        controller: Arc::new(controller),
        formatter: Arc::new(build_formatter(config)),
    })
}
