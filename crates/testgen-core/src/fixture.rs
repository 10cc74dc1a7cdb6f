//! Fixture lifecycle as scoped acquisition.
//!
//! A [`Fixture`] sets a resource up against one provider and tears it down
//! again. [`ScopedResource`] owns the acquired resource and guarantees the
//! teardown runs exactly once, either through [`ScopedResource::release`] or
//! on drop. [`Finalizers`] collects ad-hoc cleanup registered while a case
//! runs and executes it last-in first-out.

use core::fmt;
use core::ops::{Deref, DerefMut};
use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::provider::ProviderRecord;
use crate::{Error, Result};

/// How long a fixture-provided resource lives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixtureScope {
    /// Set up and torn down around every test case
    #[default]
    Function,
    /// Set up once per provider and shared by every test of a module
    Module,
}

impl fmt::Display for FixtureScope {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Function => "function",
            Self::Module => "module",
        })
    }
}

impl FromStr for FixtureScope {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        match text.to_ascii_lowercase().as_str() {
            "function" => Ok(Self::Function),
            "module" => Ok(Self::Module),
            other => Err(Error::Config(format!("unknown fixture scope: {other}"))),
        }
    }
}

/// Something a test needs prepared against a provider.
pub trait Fixture {
    /// What setup produces.
    type Resource;

    /// Name used in errors and logs.
    fn name(&self) -> &str;

    /// Prepares the resource for `provider`.
    ///
    /// # Errors
    /// Returns an error if the resource cannot be prepared; the cases that
    /// needed it are reported as setup failures.
    fn setup(&mut self, provider: &ProviderRecord) -> Result<Self::Resource>;

    /// Releases the resource.
    ///
    /// # Errors
    /// Returns an error if cleanup fails.
    fn teardown(&mut self, resource: &mut Self::Resource) -> Result<()>;
}

/// A fixture resource that is torn down when the guard goes away.
pub struct ScopedResource<'fix, F: Fixture> {
    fixture: &'fix mut F,
    resource: F::Resource,
    released: bool,
}

impl<'fix, F: Fixture> ScopedResource<'fix, F> {
    /// Runs setup and wraps the result.
    ///
    /// # Errors
    /// Propagates the fixture's setup error.
    pub fn acquire(fixture: &'fix mut F, provider: &ProviderRecord) -> Result<Self> {
        tracing::debug!(fixture = fixture.name(), provider = %provider.name, "fixture setup");
        let resource = fixture.setup(provider)?;
        Ok(Self {
            fixture,
            resource,
            released: false,
        })
    }

    /// Tears the resource down now and reports the outcome.
    ///
    /// # Errors
    /// Propagates the fixture's teardown error.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        tracing::debug!(fixture = self.fixture.name(), "fixture teardown");
        self.fixture.teardown(&mut self.resource)
    }
}

impl<F: Fixture> Deref for ScopedResource<'_, F> {
    type Target = F::Resource;

    fn deref(&self) -> &Self::Target {
        &self.resource
    }
}

impl<F: Fixture> DerefMut for ScopedResource<'_, F> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.resource
    }
}

impl<F: Fixture> Drop for ScopedResource<'_, F> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(error) = self.fixture.teardown(&mut self.resource) {
            tracing::warn!(fixture = self.fixture.name(), "teardown failed during drop: {error}");
        }
    }
}

/// A cleanup action registered by a running case.
type Finalizer = Box<dyn FnOnce() -> Result<()>>;

/// Cleanup actions run in reverse registration order.
///
/// Every finalizer runs even when an earlier one fails. Finalizers still
/// pending when the stack is dropped are run then, and their failures are
/// logged.
#[derive(Default)]
pub struct Finalizers {
    stack: Vec<(String, Finalizer)>,
}

impl Finalizers {
    /// Creates an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a named cleanup action.
    pub fn add<C>(&mut self, name: impl Into<String>, cleanup: C)
    where
        C: FnOnce() -> Result<()> + 'static,
    {
        self.stack.push((name.into(), Box::new(cleanup)));
    }

    /// Number of pending finalizers.
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Runs every pending finalizer, newest first, returning the failures.
    pub fn run(&mut self) -> Vec<Error> {
        let mut failures = Vec::new();
        while let Some((name, cleanup)) = self.stack.pop() {
            if let Err(error) = cleanup() {
                failures.push(Error::fixture(name, error.to_string()));
            }
        }
        failures
    }
}

impl fmt::Debug for Finalizers {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.stack.iter().map(|(name, _)| name.as_str()).collect();
        formatter.debug_struct("Finalizers").field("pending", &names).finish()
    }
}

impl Drop for Finalizers {
    fn drop(&mut self) {
        for failure in self.run() {
            tracing::warn!("finalizer failed during drop: {failure}");
        }
    }
}

/// Explicit per-(module, provider) context.
///
/// Holds the module-scoped resource for one provider; every test of the
/// module bound to that provider borrows it in turn.
pub struct ModuleContext<'inv, 'fix, F: Fixture> {
    provider: &'inv ProviderRecord,
    resource: ScopedResource<'fix, F>,
}

impl<'inv, 'fix, F: Fixture> ModuleContext<'inv, 'fix, F> {
    /// Sets the module fixture up for `provider`.
    ///
    /// # Errors
    /// Propagates the fixture's setup error.
    pub fn open(fixture: &'fix mut F, provider: &'inv ProviderRecord) -> Result<Self> {
        let resource = ScopedResource::acquire(fixture, provider)?;
        Ok(Self { provider, resource })
    }

    /// The provider this context was opened for.
    pub fn provider(&self) -> &'inv ProviderRecord {
        self.provider
    }

    /// Mutable access to the shared resource.
    pub fn resource_mut(&mut self) -> &mut F::Resource {
        &mut self.resource
    }

    /// Tears the module fixture down.
    ///
    /// # Errors
    /// Propagates the fixture's teardown error.
    pub fn close(self) -> Result<()> {
        self.resource.release()
    }
}
