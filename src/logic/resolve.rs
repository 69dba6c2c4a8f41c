use async_trait::async_trait;

use crate::logic::expand::ExpandError;
use crate::model::{InstancetypeSpec, PreferenceSpec, VirtualMachine};
use crate::store::traits::Store;

/// Looks up the overlay templates a virtual machine references. Injected
/// into the expansion engine so tests can substitute deterministic fakes.
/// `Ok(None)` means the entity holds no matching reference; errors reach the
/// engine's caller verbatim, and any deadline or cancellation is owned by
/// the implementation behind this trait.
#[async_trait]
pub trait TemplateResolver: Send + Sync {
    async fn resolve_instancetype(
        &self,
        vm: &VirtualMachine,
    ) -> Result<Option<InstancetypeSpec>, ExpandError>;

    async fn resolve_preference(
        &self,
        vm: &VirtualMachine,
    ) -> Result<Option<PreferenceSpec>, ExpandError>;
}

/// Production resolver: templates live in the store, in the entity's own
/// namespace.
pub struct StoreResolver<'a, S: Store> {
    store: &'a S,
}

impl<'a, S: Store> StoreResolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }
}

#[async_trait]
impl<S: Store> TemplateResolver for StoreResolver<'_, S> {
    async fn resolve_instancetype(
        &self,
        vm: &VirtualMachine,
    ) -> Result<Option<InstancetypeSpec>, ExpandError> {
        let matcher = match &vm.spec.instancetype {
            Some(matcher) => matcher,
            None => return Ok(None),
        };
        match self
            .store
            .get_instancetype(&vm.metadata.namespace, &matcher.name)
            .await
        {
            Ok(Some(template)) => Ok(Some(template.spec)),
            Ok(None) => Err(ExpandError::InstancetypeNotFound(matcher.name.clone())),
            Err(e) => Err(ExpandError::Internal(e)),
        }
    }

    async fn resolve_preference(
        &self,
        vm: &VirtualMachine,
    ) -> Result<Option<PreferenceSpec>, ExpandError> {
        let matcher = match &vm.spec.preference {
            Some(matcher) => matcher,
            None => return Ok(None),
        };
        match self
            .store
            .get_preference(&vm.metadata.namespace, &matcher.name)
            .await
        {
            Ok(Some(template)) => Ok(Some(template.spec)),
            Ok(None) => Err(ExpandError::PreferenceNotFound(matcher.name.clone())),
            Err(e) => Err(ExpandError::Internal(e)),
        }
    }
}
