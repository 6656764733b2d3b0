use tokio::sync::mpsc;
use tracing::{debug, info};
use weft_common::GraphNode;

use crate::resolver::GeocodeResolver;

/// Batch-resolves coordinates for nodes that lack them, emitting the
/// cumulative resolved set after each step so a consumer can render partial
/// progress.
///
/// Resolution is strictly sequential — one external call at a time with the
/// resolver's fixed delay in between. Respecting the provider's rate limit
/// takes priority over latency.
pub struct ProgressiveGeocoder {
    resolver: GeocodeResolver,
}

impl ProgressiveGeocoder {
    pub fn new(resolver: GeocodeResolver) -> Self {
        Self { resolver }
    }

    /// Resolve a batch. Nodes already carrying coordinates (and cache hits)
    /// are emitted immediately; the rest resolve one by one. A node that
    /// fails resolution is dropped silently. When the receiver side of
    /// `progress` is gone, the batch stops before issuing further calls.
    ///
    /// Returns the final resolved set, in emission order.
    pub async fn geocode_nodes(
        &self,
        nodes: Vec<GraphNode>,
        progress: mpsc::Sender<Vec<GraphNode>>,
    ) -> Vec<GraphNode> {
        let mut resolved: Vec<GraphNode> = Vec::new();
        let mut pending: Vec<GraphNode> = Vec::new();

        for mut node in nodes {
            if node.location.coords.is_some() {
                resolved.push(node);
            } else if node.location.has_address_text() {
                // Cache hits attach without touching the network.
                let key = node.location.address_key();
                if key.has_content() {
                    if let Some(coords) = self.resolver.cache().get(&key) {
                        node.location.coords = Some(coords);
                        resolved.push(node);
                        continue;
                    }
                }
                pending.push(node);
            }
            // Nodes with neither coordinates nor address text are skipped.
        }

        if !resolved.is_empty() && progress.send(resolved.clone()).await.is_err() {
            debug!("Progress consumer gone, stopping geocode batch");
            return resolved;
        }

        let total = pending.len();
        for (i, mut node) in pending.into_iter().enumerate() {
            if progress.is_closed() {
                debug!(done = i, total, "Progress consumer gone, stopping geocode batch");
                break;
            }
            if i > 0 {
                tokio::time::sleep(self.resolver.delay()).await;
            }

            match self.resolver.resolve_forward(&node.location).await {
                Ok(address) => {
                    node.location.coords = Some(address.coords);
                    if node.location.location_name.is_none() {
                        node.location.location_name = address.display_name;
                    }
                    resolved.push(node);
                    if progress.send(resolved.clone()).await.is_err() {
                        debug!("Progress consumer gone, stopping geocode batch");
                        break;
                    }
                }
                Err(e) => {
                    // Dropped from the output; one bad address must not halt
                    // the rest of the batch.
                    debug!(node = %node.id, error = %e, "Node failed geocoding, dropping");
                }
            }
        }

        info!(resolved = resolved.len(), "Progressive geocode batch finished");
        resolved
    }
}
