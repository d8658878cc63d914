use serenity::all::{
    ComponentInteraction, Context, CreateInteractionResponse, CreateInteractionResponseMessage,
    Interaction,
};
use tracing::{debug, warn};

use crate::{
    bot::render::{self, CANCEL_BUTTON, CLEAN_BUTTON, DELETE_BUTTON_PREFIX},
    error::ServiceError,
    services::{authoring_service, question_service},
    state::SharedState,
};

pub async fn handle(state: &SharedState, ctx: &Context, interaction: Interaction) {
    let Interaction::Component(component) = interaction else {
        return;
    };
    if let Err(err) = handle_component(state, ctx, &component).await {
        warn!(error = %err, custom_id = %component.data.custom_id, "failed to handle button");
    }
}

async fn handle_component(
    state: &SharedState,
    ctx: &Context,
    component: &ComponentInteraction,
) -> Result<(), ServiceError> {
    let user = component.user.id.get();
    let custom_id = component.data.custom_id.as_str();

    if custom_id == CANCEL_BUTTON {
        authoring_service::cancel(state, user);
        let update = CreateInteractionResponseMessage::new()
            .content("Never mind.")
            .embeds(Vec::new())
            .components(Vec::new());
        component
            .create_response(&ctx.http, CreateInteractionResponse::UpdateMessage(update))
            .await?;
    } else if custom_id == CLEAN_BUTTON {
        let update = CreateInteractionResponseMessage::new().components(Vec::new());
        component
            .create_response(&ctx.http, CreateInteractionResponse::UpdateMessage(update))
            .await?;
    } else if let Some(id) = custom_id.strip_prefix(DELETE_BUTTON_PREFIX) {
        question_service::require_author(state.config(), user)?;
        let store = state.require_store().await?;
        match question_service::delete_question(store.as_ref(), id).await {
            Ok(question) => {
                let update = CreateInteractionResponseMessage::new()
                    .content("This trivia question was deleted.")
                    .embed(render::deleted_embed(&question))
                    .components(Vec::new());
                component
                    .create_response(&ctx.http, CreateInteractionResponse::UpdateMessage(update))
                    .await?;
            }
            Err(ServiceError::NotFound(_)) => {
                let notice = CreateInteractionResponseMessage::new()
                    .content("That trivia question was already deleted.")
                    .ephemeral(true);
                component
                    .create_response(&ctx.http, CreateInteractionResponse::Message(notice))
                    .await?;
                component.message.delete(&ctx.http).await?;
            }
            Err(err) => return Err(err),
        }
    } else {
        debug!(custom_id, "unknown component");
    }
    Ok(())
}
