use std::sync::Arc ;
use std::sync::atomic::{ AtomicUsize, Ordering };
use wasm_lazy_link::{ BootDelegation, HookError, HookRegistry, Wiring };
use crate::fixture_units ;

#[test]
fn resolution_test_boot_delegation_wins() {

	let base = Arc::new( fixture_units::symbols( &[( "host.api.Clock", "from-base" )]));
	let own = fixture_units::unit( 1, "acme.app", &[( "host.api.Clock", "from-app" )]);
	let wiring = Wiring::builder( own )
		.boot_delegation( BootDelegation::new([ "host.api" ]))
		.build();

	let woven = Arc::new( AtomicUsize::new( 0 ));
	let hooks = Arc::new( HookRegistry::new() );
	let counter = woven.clone();
	hooks.register_hook( move | _: &str, _: &mut Vec<u8> | -> Result<(), HookError> {
		counter.fetch_add( 1, Ordering::SeqCst );
		Ok(())
	});

	let loader = fixture_units::loader( wiring )
		.with_base_runtime( base )
		.with_hooks( hooks );

	let clock = loader.load( "host.api.Clock" ).expect( "Failed to load delegated symbol" );
	assert_exports!( &clock, "from-base" );
	assert!( clock.source().is_base() );
	assert_eq!( clock.source().revision_id(), None );
	assert!( !clock.is_woven() );
	assert_eq!( woven.load( Ordering::SeqCst ), 0 );

	let cached = loader.cached( "host.api.Clock" ).expect( "Delegated symbol was not cached" );
	assert!( cached.source().is_some_and(| source | source.is_base() ));

}
