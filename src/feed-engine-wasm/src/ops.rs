use crate::types::FeedOperation;

/// Collects feed operations and hands them out in a safe execution order
///
/// Order: Remove -> Append -> Embed changes -> Scroll -> Settings -> Panels ->
/// Render -> Notify. Slides exist before anything scrolls to them, and
/// relative order inside each group is preserved.
#[derive(Debug, Default)]
pub struct OperationBatcher {
    removes: Vec<FeedOperation>,
    appends: Vec<FeedOperation>,
    embeds: Vec<FeedOperation>,
    scrolls: Vec<FeedOperation>,
    settings: Vec<FeedOperation>,
    panels: Vec<FeedOperation>,
    renders: Vec<FeedOperation>,
    notices: Vec<FeedOperation>,
}

impl OperationBatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, op: FeedOperation) {
        let bucket = match op {
            FeedOperation::RemoveSlide { .. } => &mut self.removes,
            FeedOperation::AppendSlide { .. } => &mut self.appends,
            FeedOperation::LoadEmbed { .. }
            | FeedOperation::UnloadEmbed { .. }
            | FeedOperation::RewriteEmbed { .. } => &mut self.embeds,
            FeedOperation::ScrollTo { .. } => &mut self.scrolls,
            FeedOperation::ApplyMute { .. }
            | FeedOperation::ApplyPlayerSize { .. }
            | FeedOperation::ApplyTextLayout { .. } => &mut self.settings,
            FeedOperation::ShowPanel { .. } | FeedOperation::HidePanel { .. } => &mut self.panels,
            FeedOperation::RenderSearchResults { .. } | FeedOperation::RenderQueue { .. } => {
                &mut self.renders
            }
            FeedOperation::Notify { .. } => &mut self.notices,
        };
        bucket.push(op);
    }

    pub fn extend<I: IntoIterator<Item = FeedOperation>>(&mut self, ops: I) {
        for op in ops {
            self.push(op);
        }
    }

    pub fn notify(&mut self, message: impl Into<String>) {
        self.push(FeedOperation::Notify {
            message: message.into(),
        });
    }

    /// Get operations in execution order
    pub fn into_ordered(mut self) -> Vec<FeedOperation> {
        let mut operations = Vec::new();

        operations.append(&mut self.removes);
        operations.append(&mut self.appends);
        operations.append(&mut self.embeds);
        operations.append(&mut self.scrolls);
        operations.append(&mut self.settings);
        operations.append(&mut self.panels);
        operations.append(&mut self.renders);
        operations.append(&mut self.notices);

        operations
    }
}
