use std::sync::Arc ;
use wasm_lazy_link::{ HookError, HookRegistry, WovenState };
use crate::fixture_units ;

#[test]
fn weaving_test_mutating_hook() {

	let hooks = Arc::new( HookRegistry::new() );
	hooks.register_hook(| name: &str, bytes: &mut Vec<u8> | -> Result<(), HookError> {
		if name == "acme.app.Main" { *bytes = fixture_units::module( "woven" ).into_bytes(); }
		Ok(())
	});
	let states = fixture_units::record_states( &hooks );
	let loader = fixture_units::loader( fixture_units::leaf( 1, "acme.app", &[
		( "acme.app.Main", "from-app" ),
		( "acme.app.Other", "from-app" ),
	])).with_hooks( hooks );

	let main = loader.load( "acme.app.Main" ).expect( "Failed to load woven symbol" );
	assert_exports!( &main, "woven" );
	assert!( main.is_woven() );

	let other = loader.load( "acme.app.Other" ).expect( "Failed to load woven symbol" );
	assert_exports!( &other, "from-app" );
	assert!( other.is_woven() );

	assert_eq!( *states.lock(), vec![
		( "acme.app.Main".to_string(), WovenState::Transformed ),
		( "acme.app.Other".to_string(), WovenState::Transformed ),
	]);

}
