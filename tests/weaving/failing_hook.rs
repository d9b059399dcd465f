use std::sync::Arc ;
use std::sync::atomic::{ AtomicUsize, Ordering };
use wasm_lazy_link::{ HookError, HookRegistry, LoadError, WovenState };
use crate::fixture_units ;

#[test]
fn weaving_test_failing_hook() {

	let later_hook_calls = Arc::new( AtomicUsize::new( 0 ));
	let counter = later_hook_calls.clone();

	let hooks = Arc::new( HookRegistry::new() );
	hooks.register_hook(| name: &str, _: &mut Vec<u8> | -> Result<(), HookError> {
		Err( format!( "refusing to weave {}", name ).into() )
	});
	hooks.register_hook( move | _: &str, _: &mut Vec<u8> | -> Result<(), HookError> {
		counter.fetch_add( 1, Ordering::SeqCst );
		Ok(())
	});
	let states = fixture_units::record_states( &hooks );
	let loader = fixture_units::loader( fixture_units::leaf( 1, "acme.app", &[( "acme.app.Main", "from-app" )]))
		.with_hooks( hooks );

	match loader.load( "acme.app.Main" ) {
		Err( LoadError::TransformFailed { name, reason }) => {
			assert_eq!( name, "acme.app.Main" );
			assert_eq!( reason.to_string(), "refusing to weave acme.app.Main" );
		},
		result => panic!( "Expected TransformFailed, found: {:?}", result ),
	}
	assert_eq!( later_hook_calls.load( Ordering::SeqCst ), 0 );
	assert_eq!( *states.lock(), vec![( "acme.app.Main".to_string(), WovenState::TransformingFailed )]);

	// transform failures are not remembered
	assert!( loader.cached( "acme.app.Main" ).is_none() );
	assert!( loader.load( "acme.app.Main" ).is_err() );
	assert_eq!( states.lock().len(), 2 );

}
