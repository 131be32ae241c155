use renderer::{
    animation_figure, surface_figure, AnimationSettings, RenderError, RenderOperation, Renderer,
};
use scene::Scene;

use crate::{error::VisualizationError, playback::PlaybackController};

/// Sends a fully built scene to the renderer: surfaces are drawn in one
/// call, animations go through the playback handshake.
pub async fn present_scene(
    renderer: &dyn Renderer,
    playback: &mut PlaybackController,
    scene: &Scene,
    settings: &AnimationSettings,
) -> Result<(), VisualizationError> {
    match scene {
        Scene::Surface3D(surface) => {
            let figure = surface_figure(surface);
            let target = playback.target();
            renderer
                .initialize(target, &figure.traces, &figure.layout, &figure.config)
                .await
                .map_err(|err| RenderError::new(RenderOperation::Initialize, target, &err))?;
            Ok(())
        }
        Scene::Animated2D(animated) => {
            let figure = animation_figure(animated, settings);
            playback.load(&figure).await?;
            Ok(())
        }
    }
}
