use std::fmt::Debug;
use std::future::Future;
use std::marker::PhantomData;

/// What a batch load resolves to: one result per key, or a failure that
/// applies to the whole batch.
pub type BatchResult<V, E> = Result<Vec<Result<V, E>>, E>;

/// Trait for batch loading.
///
/// The returned vector must have exactly one entry per key, in the same order
/// as `keys`. An `Err` at position `i` fails only the caller waiting on
/// `keys[i]`; an outer `Err` fails every caller of the batch.
#[async_trait::async_trait]
pub trait Loader<K: Send + Sync + 'static>: Send + Sync + 'static {
    /// type of value.
    type Value: Send + Sync + Clone + 'static;

    /// Type of error.
    type Error: Send + Sync + Clone + Debug + 'static;

    /// Load the data set specified by the `keys`.
    async fn load(&self, keys: &[K]) -> BatchResult<Self::Value, Self::Error>;
}

/// Adapts an async closure into a [Loader].
///
/// ```ignore
/// let loader = LoadFn::new(|ids: Vec<u64>| async move {
///     Ok::<_, String>(ids.into_iter().map(|id| Ok(id * 10)).collect())
/// });
/// ```
pub struct LoadFn<F, K> {
    func: F,
    _key: PhantomData<fn(K)>,
}

impl<F, K> LoadFn<F, K> {
    pub fn new(func: F) -> Self {
        Self { func, _key: PhantomData }
    }
}

#[async_trait::async_trait]
impl<K, V, E, F, Fut> Loader<K> for LoadFn<F, K>
where
    K: Clone + Send + Sync + 'static,
    V: Send + Sync + Clone + 'static,
    E: Send + Sync + Clone + Debug + 'static,
    F: Fn(Vec<K>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = BatchResult<V, E>> + Send,
{
    type Value = V;
    type Error = E;

    async fn load(&self, keys: &[K]) -> BatchResult<V, E> {
        (self.func)(keys.to_vec()).await
    }
}
