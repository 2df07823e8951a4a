pub mod broadcaster;
mod sse;

pub use broadcaster::{
    BroadcastError, BroadcastReport, ChangeNotifier, ChannelSink, ClientSink, ConnectionId,
    ConnectionState, DeliveryError, ProductBroadcaster, ProductSource, ProductsChanged,
    Subscription,
};
pub use sse::{SseStreamBuilder, handle_product_stream};
