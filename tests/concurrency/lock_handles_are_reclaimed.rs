use wasm_lazy_link::LockMode ;
use crate::fixture_units ;

const NAMES: [&str; 4] = [ "acme.app.A", "acme.app.B", "acme.app.C", "acme.app.Missing" ];

#[test]
fn concurrency_test_lock_handles_are_reclaimed() {

	let wiring = fixture_units::leaf( 1, "acme.app", &[
		( "acme.app.A", "a" ),
		( "acme.app.B", "b" ),
		( "acme.app.C", "c" ),
	]);

	let loader = fixture_units::loader( wiring.clone() );
	std::thread::scope(| scope | {
		for _ in 0..4 {
			scope.spawn(|| NAMES.iter().for_each(| name | { let _ = loader.load( name ); }));
		}
	});
	assert_eq!( loader.lock_handles(), 0 );
	assert!( NAMES.iter().all(| name | loader.cached( name ).is_some() ));

	let loader = fixture_units::loader( wiring ).with_lock_mode( LockMode::PerUnit );
	NAMES.iter().for_each(| name | { let _ = loader.load( name ); });
	assert_eq!( loader.lock_handles(), 1 );

}
