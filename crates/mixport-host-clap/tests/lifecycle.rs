//! Instance lifecycle against a scripted in-process plugin factory.

use std::cell::RefCell;
use std::ffi::CString;

use mixport_host_clap::ffi::{
    clap_host, clap_plugin, clap_plugin_descriptor, clap_plugin_factory, clap_version_t,
    CLAP_EXT_PARAMS, CLAP_VERSION,
};
use mixport_host_clap::{HostConfig, HostError, HostHandle, PluginHandle};

struct Fixture {
    _id: CString,
    _name: CString,
    descriptor: Box<clap_plugin_descriptor>,
    plugin: Box<clap_plugin>,
    create_calls: u32,
    init_calls: u32,
    destroy_calls: u32,
    host_seen_by_create: *const clap_host,
    init_saw_host_params: bool,
}

thread_local! {
    static FIXTURE: RefCell<Option<Fixture>> = const { RefCell::new(None) };
}

unsafe extern "C" fn factory_get_plugin_count(_factory: *const clap_plugin_factory) -> u32 {
    1
}

unsafe extern "C" fn factory_get_plugin_descriptor(
    _factory: *const clap_plugin_factory,
    index: u32,
) -> *const clap_plugin_descriptor {
    if index != 0 {
        return std::ptr::null();
    }
    FIXTURE.with(|f| {
        f.borrow()
            .as_ref()
            .map(|fixture| &*fixture.descriptor as *const _)
            .unwrap_or(std::ptr::null())
    })
}

unsafe extern "C" fn factory_create_plugin(
    _factory: *const clap_plugin_factory,
    host: *const clap_host,
    _plugin_id: *const core::ffi::c_char,
) -> *const clap_plugin {
    FIXTURE.with(|f| {
        let mut borrow = f.borrow_mut();
        let fixture = borrow.as_mut().unwrap();
        fixture.create_calls += 1;
        fixture.host_seen_by_create = host;
        &*fixture.plugin as *const _
    })
}

unsafe extern "C" fn plugin_init(_plugin: *const clap_plugin) -> bool {
    FIXTURE.with(|f| {
        let mut borrow = f.borrow_mut();
        let fixture = borrow.as_mut().unwrap();
        fixture.init_calls += 1;
        // The host surface must already be queryable from inside init.
        let host = fixture.host_seen_by_create;
        if !host.is_null() {
            if let Some(get_extension) = (*host).get_extension {
                let ext = get_extension(host, CLAP_EXT_PARAMS.as_ptr() as *const _);
                fixture.init_saw_host_params = !ext.is_null();
            }
        }
        true
    })
}

unsafe extern "C" fn plugin_destroy(_plugin: *const clap_plugin) {
    FIXTURE.with(|f| {
        if let Some(fixture) = f.borrow_mut().as_mut() {
            fixture.destroy_calls += 1;
        }
    });
}

static FACTORY: clap_plugin_factory = clap_plugin_factory {
    get_plugin_count: Some(factory_get_plugin_count),
    get_plugin_descriptor: Some(factory_get_plugin_descriptor),
    create_plugin: Some(factory_create_plugin),
};

fn install_fixture(version: clap_version_t) {
    let id = CString::new("com.example.fuzz").unwrap();
    let name = CString::new("Fuzz").unwrap();
    let descriptor = Box::new(clap_plugin_descriptor {
        clap_version: version,
        id: id.as_ptr(),
        name: name.as_ptr(),
        vendor: std::ptr::null(),
        url: std::ptr::null(),
        manual_url: std::ptr::null(),
        support_url: std::ptr::null(),
        version: std::ptr::null(),
        description: std::ptr::null(),
        features: std::ptr::null(),
    });
    let plugin = Box::new(clap_plugin {
        desc: &*descriptor,
        plugin_data: std::ptr::null_mut(),
        init: Some(plugin_init),
        destroy: Some(plugin_destroy),
        activate: None,
        deactivate: None,
        start_processing: None,
        stop_processing: None,
        reset: None,
        process: None,
        get_extension: None,
        on_main_thread: None,
    });
    FIXTURE.with(|f| {
        *f.borrow_mut() = Some(Fixture {
            _id: id,
            _name: name,
            descriptor,
            plugin,
            create_calls: 0,
            init_calls: 0,
            destroy_calls: 0,
            host_seen_by_create: std::ptr::null(),
            init_saw_host_params: false,
        })
    });
}

fn with_fixture<R>(read: impl FnOnce(&Fixture) -> R) -> R {
    FIXTURE.with(|f| read(f.borrow().as_ref().unwrap()))
}

fn descriptor_ptr() -> *const clap_plugin_descriptor {
    with_fixture(|fixture| &*fixture.descriptor as *const _)
}

#[test]
fn incompatible_major_version_is_rejected_before_create() {
    install_fixture(clap_version_t {
        major: 0,
        minor: 9,
        revision: 0,
    });
    let host = HostHandle::new(&HostConfig::default());
    let result = unsafe { PluginHandle::create(&FACTORY, descriptor_ptr(), host.as_raw()) };
    assert!(matches!(
        result,
        Err(HostError::VersionMismatch { major: 0, .. })
    ));
    assert_eq!(with_fixture(|f| f.create_calls), 0);
    assert_eq!(with_fixture(|f| f.init_calls), 0);
}

#[test]
fn activating_an_active_plugin_is_a_hard_precondition_failure() {
    install_fixture(CLAP_VERSION);
    let host = HostHandle::new(&HostConfig::default());
    let mut handle = unsafe { PluginHandle::create(&FACTORY, descriptor_ptr(), host.as_raw()) }
        .expect("create should succeed");
    unsafe {
        handle.activate(48_000.0, 1, 512).expect("first activation");
        assert!(matches!(
            handle.activate(48_000.0, 1, 512),
            Err(HostError::ActivationPrecondition)
        ));
        handle.deactivate();
        handle.activate(48_000.0, 1, 512).expect("reactivation after deactivate");
    }
}

#[test]
fn create_installs_host_before_init_and_destroys_once() {
    install_fixture(CLAP_VERSION);
    let host = HostHandle::new(&HostConfig::default());
    let handle = unsafe { PluginHandle::create(&FACTORY, descriptor_ptr(), host.as_raw()) }
        .expect("create should succeed");
    assert_eq!(handle.descriptor().id, "com.example.fuzz");
    assert_eq!(handle.descriptor().name, "Fuzz");
    assert_eq!(with_fixture(|f| f.create_calls), 1);
    assert_eq!(with_fixture(|f| f.init_calls), 1);
    assert!(with_fixture(|f| f.init_saw_host_params));

    drop(handle);
    assert_eq!(with_fixture(|f| f.destroy_calls), 1);
}
