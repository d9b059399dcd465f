//! Concurrency gate for in-flight loads.
//!
//! A [`LoadLock`] guarantees at most one in-flight load per contended key. In
//! [`LockMode::PerName`] the key is the symbol name, so loads of distinct names
//! proceed in parallel. In [`LockMode::PerUnit`] every load through the loader
//! shares one key and is fully serialized.
//!
//! Each key is guarded by a FIFO ticket gate. Waiters are admitted strictly in
//! arrival order. A gate is re-entrant for the thread holding it, except for a
//! name that thread is already loading: that request is circular and is refused
//! with [`LoadError::Circular`]. Per-name gates
//! are created on demand and reclaimed once nobody holds or awaits them; tickets
//! are only issued and gates only reclaimed while the gate map is locked, so a
//! reclaim can never race a new acquirer.
//!
//! When an attempt fails in the pipeline, the failure is left on the gate for
//! the waiters that queued for the same name during that attempt. They observe
//! the holder's failure instead of running the pipeline again. Requests that
//! arrive after the release start a fresh attempt.

use std::collections::HashMap ;
use std::sync::Arc ;
use std::thread::ThreadId ;
use parking_lot::{ Condvar, Mutex };
use tracing::{ debug, trace };

use crate::loader::LoadError ;



/// Granularity of the load lock, chosen once per loader.
#[derive( Debug, Copy, Clone, Default, PartialEq, Eq, Hash )]
pub enum LockMode {
	/// Loads of the same name serialize; distinct names load in parallel.
	#[default] PerName,
	/// Every load through the loader serializes, whatever the name.
	PerUnit,
}

impl std::fmt::Display for LockMode {
	fn fmt( &self, f: &mut std::fmt::Formatter ) -> std::fmt::Result { write!( f, "{:?}", self )}
}

struct SharedFailure {
	name: String,
	/// Tickets issued before this one queued during the failed attempt.
	until: u64,
	error: LoadError,
}

#[derive( Default )]
struct GateState {
	next_ticket: u64,
	now_serving: u64,
	holder: Option<ThreadId>,
	/// Names the holder is loading, outermost first.
	in_flight: Vec<String>,
	failures: Vec<SharedFailure>,
}

#[derive( Default )]
struct Gate {
	state: Mutex<GateState>,
	turn: Condvar,
}

enum Ticket {
	Queued( u64 ),
	Reentrant,
	Circular,
}

impl Gate {

	fn ticket( &self, name: &str ) -> Ticket {
		let mut state = self.state.lock();
		let current = std::thread::current().id();
		if state.holder == Some( current ) {
			if state.in_flight.iter().any(| held | held == name ) { return Ticket::Circular }
			state.in_flight.push( name.to_string() );
			return Ticket::Reentrant ;
		}
		let ticket = state.next_ticket ;
		state.next_ticket += 1 ;
		Ticket::Queued( ticket )
	}

	/// Blocks until `ticket` is served; returns the failure a previous holder
	/// left for `name`, if any.
	fn wait_turn( &self, ticket: u64, name: &str ) -> Option<LoadError> {
		let mut state = self.state.lock();
		while state.now_serving != ticket { self.turn.wait( &mut state ); }
		state.holder = Some( std::thread::current().id() );
		state.in_flight = vec![ name.to_string() ];
		state.failures.retain(| failure | failure.until > ticket );
		state.failures.iter()
			.find(| failure | failure.name == name )
			.map(| failure | failure.error.clone() )
	}

	/// Returns `true` if the gate is idle afterwards.
	fn release( &self, reentrant: bool, failure: Option<( String, LoadError )> ) -> bool {
		let mut state = self.state.lock();
		if let Some(( name, error )) = failure {
			let until = state.next_ticket ;
			state.failures.push( SharedFailure { name, until, error });
		}
		if reentrant {
			state.in_flight.pop();
			return false ;
		}
		state.holder = None ;
		state.in_flight.clear();
		state.now_serving += 1 ;
		self.turn.notify_all();
		let idle = state.now_serving == state.next_ticket ;
		if idle { state.failures.clear(); }
		idle
	}

	fn waiting( &self ) -> usize {
		let state = self.state.lock();
		let queued = state.next_ticket - state.now_serving ;
		let queued = match state.holder.is_some() {
			true => queued.saturating_sub( 1 ),
			false => queued,
		};
		usize::try_from( queued ).unwrap_or( usize::MAX )
	}

}

enum Gates {
	PerName( Mutex<HashMap<String, Arc<Gate>>> ),
	PerUnit( Arc<Gate> ),
}

/// The load lock of one loader. See the [module docs]( self ).
pub struct LoadLock {
	gates: Gates,
}

impl LoadLock {

	/// Creates a lock operating in `mode`.
	pub fn new( mode: LockMode ) -> Self {
		Self { gates: match mode {
			LockMode::PerName => Gates::PerName( Mutex::new( HashMap::new() )),
			LockMode::PerUnit => Gates::PerUnit( Arc::new( Gate::default() )),
		}}
	}

	/// The mode this lock operates in.
	pub fn mode( &self ) -> LockMode {
		match self.gates {
			Gates::PerName( _ ) => LockMode::PerName,
			Gates::PerUnit( _ ) => LockMode::PerUnit,
		}
	}

	/// Blocks until the caller may load `name`. The lock is released when the
	/// returned permit is dropped.
	///
	/// # Errors
	/// Returns [`LoadError::Circular`] if the calling thread is already loading
	/// `name`; waiting would never end.
	pub fn acquire( &self, name: &str ) -> Result<LoadPermit<'_>, LoadError> {

		let ( gate, ticket ) = match &self.gates {
			Gates::PerName( gates ) => {
				let mut gates = gates.lock();
				let gate = gates.entry( name.to_string() ).or_default().clone();
				let ticket = gate.ticket( name );
				( gate, ticket )
			},
			Gates::PerUnit( gate ) => ( gate.clone(), gate.ticket( name )),
		};

		let ( reentrant, shared_failure ) = match ticket {
			Ticket::Circular => {
				debug!( symbol = name, "circular load refused" );
				return Err( LoadError::Circular( name.to_string() ));
			},
			Ticket::Reentrant => ( true, None ),
			Ticket::Queued( ticket ) => ( false, gate.wait_turn( ticket, name )),
		};
		trace!( symbol = name, reentrant, "load lock acquired" );

		Ok( LoadPermit { lock: self, gate, name: name.to_string(), reentrant, shared_failure, failure: None })
	}

	/// Number of callers queued behind the current holder of `name`'s key.
	pub fn waiting( &self, name: &str ) -> usize {
		match &self.gates {
			Gates::PerName( gates ) => gates.lock().get( name ).map_or( 0, | gate | gate.waiting() ),
			Gates::PerUnit( gate ) => gate.waiting(),
		}
	}

	/// Number of live gates. Per-name gates are reclaimed once idle, a per-unit
	/// lock always has exactly one.
	pub fn handles( &self ) -> usize {
		match &self.gates {
			Gates::PerName( gates ) => gates.lock().len(),
			Gates::PerUnit( _ ) => 1,
		}
	}

	fn release( &self, permit: &mut LoadPermit<'_> ) {
		let failure = permit.failure.take().map(| error | ( permit.name.clone(), error ));
		match &self.gates {
			Gates::PerName( gates ) => {
				let mut gates = gates.lock();
				if permit.gate.release( permit.reentrant, failure ) {
					gates.remove( &permit.name );
				}
			},
			Gates::PerUnit( gate ) => { gate.release( permit.reentrant, failure ); },
		}
		trace!( symbol = permit.name.as_str(), "load lock released" );
	}

}

impl std::fmt::Debug for LoadLock {
	fn fmt( &self, f: &mut std::fmt::Formatter<'_> ) -> std::fmt::Result {
		f.debug_struct( "LoadLock" )
			.field( "mode", &self.mode() )
			.field( "handles", &self.handles() )
			.finish()
	}
}

/// Exclusive right to load a name, released on drop.
#[must_use = "the load lock is released as soon as the permit is dropped"]
pub struct LoadPermit<'a> {
	lock: &'a LoadLock,
	gate: Arc<Gate>,
	name: String,
	reentrant: bool,
	shared_failure: Option<LoadError>,
	failure: Option<LoadError>,
}

impl LoadPermit<'_> {

	/// The failure the previous holder produced for this name while the caller
	/// was queued, if any.
	pub fn take_shared_failure( &mut self ) -> Option<LoadError> { self.shared_failure.take() }

	/// Leaves `error` for the callers queued on this name.
	pub fn fail( &mut self, error: &LoadError ) { self.failure = Some( error.clone() ); }

	/// Whether this permit was granted to a thread already holding the key.
	#[inline] pub fn is_reentrant( &self ) -> bool { self.reentrant }

}

impl Drop for LoadPermit<'_> {
	fn drop( &mut self ) {
		let lock = self.lock ;
		lock.release( self );
	}
}



#[cfg( test )]
mod tests {

	use super::* ;
	use std::time::Duration ;

	fn wait_for( mut condition: impl FnMut() -> bool ) {
		while !condition() { std::thread::sleep( Duration::from_millis( 1 )); }
	}

	fn failure() -> LoadError {
		LoadError::TransformFailed { name: "a.B".to_string(), reason: Arc::new( "bad weaver".into() )}
	}

	#[test]
	fn per_name_gates_are_reclaimed() {
		let lock = LoadLock::new( LockMode::PerName );
		{
			let _a = lock.acquire( "a.A" ).expect( "acquired" );
			let _b = lock.acquire( "a.B" ).expect( "acquired" );
			assert_eq!( lock.handles(), 2 );
		}
		assert_eq!( lock.handles(), 0 );
	}

	#[test]
	fn gate_is_reentrant_for_holder() {
		let lock = LoadLock::new( LockMode::PerUnit );
		let outer = lock.acquire( "a.A" ).expect( "acquired" );
		let inner = lock.acquire( "a.B" ).expect( "acquired" );
		assert!( !outer.is_reentrant() );
		assert!( inner.is_reentrant() );
		drop( inner );
		assert_eq!( lock.waiting( "a.A" ), 0 );
		drop( outer );
		let again = lock.acquire( "a.C" ).expect( "acquired" );
		assert!( !again.is_reentrant() );
	}

	#[test]
	fn same_name_reentry_is_circular() {
		for mode in [ LockMode::PerName, LockMode::PerUnit ] {
			let lock = LoadLock::new( mode );
			let outer = lock.acquire( "a.A" ).expect( "acquired" );
			assert!( matches!( lock.acquire( "a.A" ), Err( LoadError::Circular( name )) if name == "a.A" ));
			let inner = lock.acquire( "a.B" ).expect( "acquired" );
			assert!( matches!( lock.acquire( "a.B" ), Err( LoadError::Circular( _ ))));
			assert!( matches!( lock.acquire( "a.A" ), Err( LoadError::Circular( _ ))));
			drop( inner );
			assert!( lock.acquire( "a.B" ).is_ok() );
			drop( outer );
			assert!( lock.acquire( "a.A" ).is_ok() );
			assert_eq!( lock.handles(), usize::from( mode == LockMode::PerUnit ));
		}
	}

	#[test]
	fn waiters_are_admitted_in_arrival_order() {
		let lock = LoadLock::new( LockMode::PerName );
		let order = Mutex::new( Vec::new() );
		std::thread::scope(| scope | {
			let holder = lock.acquire( "a.A" ).expect( "acquired" );
			scope.spawn(|| { let _permit = lock.acquire( "a.A" ).expect( "acquired" ); order.lock().push( 1 ); });
			wait_for(|| lock.waiting( "a.A" ) == 1 );
			scope.spawn(|| { let _permit = lock.acquire( "a.A" ).expect( "acquired" ); order.lock().push( 2 ); });
			wait_for(|| lock.waiting( "a.A" ) == 2 );
			drop( holder );
		});
		assert_eq!( *order.lock(), vec![ 1, 2 ]);
		assert_eq!( lock.handles(), 0 );
	}

	#[test]
	fn queued_waiters_share_failure() {
		let lock = LoadLock::new( LockMode::PerName );
		std::thread::scope(| scope | {
			let mut holder = lock.acquire( "a.B" ).expect( "acquired" );
			let waiter = scope.spawn(|| lock.acquire( "a.B" ).expect( "acquired" ).take_shared_failure().is_some() );
			wait_for(|| lock.waiting( "a.B" ) == 1 );
			holder.fail( &failure() );
			drop( holder );
			assert!( waiter.join().expect( "waiter panicked" ));
		});
		assert!( lock.acquire( "a.B" ).expect( "acquired" ).take_shared_failure().is_none() );
	}

	#[test]
	fn per_unit_failure_is_kept_per_name() {
		let lock = LoadLock::new( LockMode::PerUnit );
		std::thread::scope(| scope | {
			let mut holder = lock.acquire( "a.B" ).expect( "acquired" );
			let waiter = scope.spawn(|| lock.acquire( "a.C" ).expect( "acquired" ).take_shared_failure().is_some() );
			wait_for(|| lock.waiting( "a.C" ) == 1 );
			holder.fail( &failure() );
			drop( holder );
			assert!( !waiter.join().expect( "waiter panicked" ));
		});
	}

}
