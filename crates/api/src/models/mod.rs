//! API data models.

pub mod artwork;
pub mod cart;
pub mod envelope;
pub mod order;
pub mod payment;
pub mod wishlist;

pub use artwork::{Artwork, ArtworkPatch, ArtworkQuery, ArtworkSort, ArtworkView, NewArtwork};
pub use cart::{
    Cart, CartCheckout, CartItem, CartItemPatch, CartItemQuery, CartItemView, CartPatch,
    CartQuery, CartSummary, CartView, NewCart, NewCartItem, validate_quantity,
};
pub use envelope::{DataBody, Envelope, PageRequest, Pagination};
pub use order::{
    NewOrder, NewOrderedItem, Order, OrderLine, OrderPatch, OrderQuery, OrderSummary, OrderView,
    OrderedItem, OrderedItemPatch, OrderedItemQuery, OrderedItemView, validate_shipping_address,
};
pub use payment::{
    ConfirmIntentRequest, CreateIntentRequest, IntentView, RefundRequest, RefundView, WebhookAck,
};
pub use wishlist::{
    NewWishlist, Wishlist, WishlistArtwork, WishlistPatch, WishlistQuery, WishlistView,
};
