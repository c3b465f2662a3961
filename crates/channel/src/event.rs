/// Events the plugin surfaces to the hosting application.
///
/// Consumed from the receiver handed out by
/// [`ChannelPlugin::new`](crate::ChannelPlugin::new); emission order is
/// delivery order.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// The inbound subscription is confirmed. Emitted exactly once per
    /// process lifetime, before the first `Data` event.
    Ready,

    /// One successfully decoded inbound message.
    Data(serde_json::Value),
}
