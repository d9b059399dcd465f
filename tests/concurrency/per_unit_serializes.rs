use std::sync::Arc ;
use std::sync::atomic::{ AtomicBool, Ordering };
use wasm_lazy_link::{ HookError, HookRegistry, LockMode };
use crate::fixture_units ;

#[test]
fn concurrency_test_per_unit_serializes() {

	let entered = Arc::new( AtomicBool::new( false ));
	let released = Arc::new( AtomicBool::new( false ));
	let ( entered_flag, gate ) = ( entered.clone(), released.clone() );

	let hooks = Arc::new( HookRegistry::new() );
	hooks.register_hook( move | name: &str, _: &mut Vec<u8> | -> Result<(), HookError> {
		if name == "acme.app.Slow" {
			entered_flag.store( true, Ordering::SeqCst );
			fixture_units::wait_until(|| gate.load( Ordering::SeqCst ));
		}
		Ok(())
	});
	let loader = fixture_units::loader( fixture_units::leaf( 1, "acme.app", &[
		( "acme.app.Slow", "slow" ),
		( "acme.app.Fast", "fast" ),
	]))
		.with_hooks( hooks )
		.with_lock_mode( LockMode::PerUnit );

	std::thread::scope(| scope | {
		let slow = scope.spawn(|| loader.load( "acme.app.Slow" ));
		fixture_units::wait_until(|| entered.load( Ordering::SeqCst ));

		let fast = scope.spawn(|| loader.load( "acme.app.Fast" ));
		fixture_units::wait_until(|| loader.waiting( "acme.app.Fast" ) == 1 );
		assert!( !fast.is_finished() );
		assert!( loader.cached( "acme.app.Fast" ).is_none() );

		released.store( true, Ordering::SeqCst );
		assert!( slow.join().expect( "Loader thread panicked" ).is_ok() );
		assert!( fast.join().expect( "Loader thread panicked" ).is_ok() );
	});

	assert_eq!( loader.lock_handles(), 1 );
	assert_eq!( loader.waiting( "acme.app.Fast" ), 0 );

}
