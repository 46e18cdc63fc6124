use crate::pool::{LocalPool, LocalSpawner};
use corio_reactor::reactor;
use futures_core::future::{FutureObj, LocalFutureObj};
use futures_core::task::{LocalSpawn, Spawn, SpawnError};
use futures_executor::Enter;
use std::future::Future;
use std::io;

/// Runtime
///
/// When running/entered it supports the following subsystems:
/// - [`corio::reactor::current()`](reactor/fn.current.html), also automatically used by
///   [`corio::reactor::LazyHandle`](reactor/struct.LazyHandle.html)
/// - [`corio::pool::current_local()`](pool/fn.current_local.html)
///
/// Unlike the teacher, there is no separate timer layer: `corio-reactor`'s
/// `Reactor` already combines fd readiness and timer delivery behind one
/// `mio::Poll` loop, so the runtime only has to combine it with the pool.
#[derive(Debug)]
pub struct Runtime {
	reactor: reactor::Reactor,
	local_pool: LocalPool,
}

impl Runtime {
	/// Create new runtime
	pub fn new() -> io::Result<Self> {
		Ok(Self {
			reactor: reactor::Reactor::new()?,
			local_pool: LocalPool::new(),
		})
	}

	/// Handle to the runtime
	pub fn handle(&self) -> Handle {
		Handle {
			reactor_handle: self.reactor.handle(),
			local_spawner: self.local_pool.spawner(),
		}
	}

	fn enter<F, T>(&mut self, enter: &mut Enter, f: F) -> T
	where
		F: FnOnce(&mut Self, &mut Enter) -> T,
	{
		self.reactor.handle().enter(enter, move |enter| {
			self.local_pool.spawner().enter(enter, move |enter| f(self, enter))
		})
	}

	/// Spawn future on runtime
	pub fn spawn<F>(&self, future: F)
	where
		F: Future<Output = ()> + 'static,
	{
		self.local_pool.spawn(Box::pin(future).into())
	}

	/// Spawn future object on runtime
	pub fn spawn_local_obj(&self, future: LocalFutureObj<'static, ()>) {
		self.local_pool.spawn(future)
	}

	/// Runs all the tasks in the pool until the given future completes.
	///
	/// The given spawner, `spawn`, is used as the default spawner for any
	/// *newly*-spawned tasks. You can route these additional tasks back into
	/// the `LocalPool` by using its spawner handle:
	///
	/// The function will block the calling thread *only* until the future `f`
	/// completes; there may still be incomplete tasks in the pool, which will
	/// be inert after the call completes, but can continue with further use of
	/// one of the pool's run or poll methods. While the function is running,
	/// however, all tasks in the pool will try to make progress.
	pub fn enter_run_until<F, T>(&mut self, enter: &mut Enter, future: F) -> T
	where
		F: Future<Output = T>,
	{
		self.enter(enter, |this, enter| this.local_pool.run_until(&mut this.reactor, enter, future))
	}

	/// Runs all the tasks in the pool until the given future completes.
	///
	/// The given spawner, `spawn`, is used as the default spawner for any
	/// *newly*-spawned tasks. You can route these additional tasks back into
	/// the `LocalPool` by using its spawner handle:
	///
	/// The function will block the calling thread *only* until the future `f`
	/// completes; there may still be incomplete tasks in the pool, which will
	/// be inert after the call completes, but can continue with further use of
	/// one of the pool's run or poll methods. While the function is running,
	/// however, all tasks in the pool will try to make progress.
	pub fn run_until<F, T>(&mut self, future: F) -> T
	where
		F: Future<Output = T>,
	{
		let mut enter = futures_executor::enter().unwrap();
		self.enter_run_until(&mut enter, future)
	}

	/// Run all tasks in the pool to completion.
	///
	/// The function will block the calling thread until *all* tasks in the pool
	/// completed, including any spawned while running existing tasks.
	pub fn enter_run(&mut self, enter: &mut Enter) {
		self.enter(enter, |this, enter| this.local_pool.run(&mut this.reactor, enter))
	}

	/// Run all tasks in the pool to completion.
	///
	/// The function will block the calling thread until *all* tasks in the pool
	/// completed, including any spawned while running existing tasks.
	pub fn run(&mut self) {
		let mut enter = futures_executor::enter().unwrap();
		self.enter_run(&mut enter)
	}
}

impl Spawn for Runtime {
	fn spawn_obj(&mut self, future: FutureObj<'static, ()>) -> Result<(), SpawnError> {
		self.spawn_local_obj(future.into())
	}

	fn status(&self) -> Result<(), SpawnError> {
		self.status_local()
	}
}

impl LocalSpawn for Runtime {
	fn spawn_local_obj(&mut self, future: LocalFutureObj<'static, ()>) -> Result<(), SpawnError> {
		self.local_pool.spawn_local_obj(future)
	}

	fn status_local(&self) -> Result<(), SpawnError> {
		self.local_pool.status_local()
	}
}

/// Handle to runtime
///
/// Contains handles for the subsystems.
#[derive(Clone, Debug)]
pub struct Handle {
	reactor_handle: corio_reactor::reactor::Handle,
	local_spawner: LocalSpawner,
}

impl Handle {
	/// Set thread-local "current" handles for reactor and spawner while executing `f`.
	pub fn enter<F, T>(&self, enter: &mut Enter, f: F) -> T
	where
		F: FnOnce(&mut Enter) -> T,
	{
		self.reactor_handle.clone().enter(enter, move |enter| self.local_spawner.clone().enter(enter, f))
	}

	/// Retrieve handle to reactor
	pub fn reactor(&self) -> corio_reactor::reactor::Handle {
		self.reactor_handle.clone()
	}

	/// Retrieve handle to spawner
	pub fn spawner(&self) -> LocalSpawner {
		self.local_spawner.clone()
	}
}

impl Spawn for Handle {
	fn spawn_obj(&mut self, future: FutureObj<'static, ()>) -> Result<(), SpawnError> {
		self.spawn_local_obj(future.into())
	}

	fn status(&self) -> Result<(), SpawnError> {
		self.status_local()
	}
}

impl LocalSpawn for Handle {
	fn spawn_local_obj(&mut self, future: LocalFutureObj<'static, ()>) -> Result<(), SpawnError> {
		self.local_spawner.spawn_local_obj(future)
	}

	fn status_local(&self) -> Result<(), SpawnError> {
		self.local_spawner.status_local()
	}
}
