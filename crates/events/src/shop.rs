use stockroom_core::ShopId;

/// Messages that belong to exactly one shop.
///
/// Lets workers be pinned to a shop and ignore everything else.
pub trait ShopScoped {
    fn shop_id(&self) -> ShopId;
}
