//! Shared fixtures for forge-build integration tests

#![allow(dead_code)]

use forge_build::shadow::Archive;
use forge_build::DependencyCoordinate;

/// Minimal class file whose constant pool holds the given Utf8 strings and a
/// Class entry naming the first one
pub fn class_file(strings: &[&str]) -> Vec<u8> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&0xCAFE_BABEu32.to_be_bytes());
    bytes.extend_from_slice(&0u16.to_be_bytes());
    bytes.extend_from_slice(&52u16.to_be_bytes());

    let count = strings.len() as u16 + 2;
    bytes.extend_from_slice(&count.to_be_bytes());
    for s in strings {
        bytes.push(1);
        bytes.extend_from_slice(&(s.len() as u16).to_be_bytes());
        bytes.extend_from_slice(s.as_bytes());
    }
    bytes.push(7);
    bytes.extend_from_slice(&1u16.to_be_bytes());

    bytes.extend_from_slice(&[0x00, 0x21]);
    bytes.extend_from_slice(&(strings.len() as u16 + 1).to_be_bytes());
    bytes.extend_from_slice(&0u16.to_be_bytes());
    bytes.extend_from_slice(&[0; 8]);
    bytes
}

pub fn coordinate(s: &str) -> DependencyCoordinate {
    s.parse().unwrap()
}

/// Output of owned module A
pub fn module_a() -> Archive {
    Archive::new()
        .with_entry(
            "com/example/a/Main.class",
            class_file(&["com/example/a/Main", "com/libx/Foo", "(Lcom/libx/Foo;)V"]),
        )
        .with_entry("plugin.yml", b"main: com.example.a.Main\n".to_vec())
        .with_entry("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0\r\n\r\n".to_vec())
}

/// Output of owned module B
pub fn module_b() -> Archive {
    Archive::new().with_entry(
        "com/example/b/Helper.class",
        class_file(&["com/example/b/Helper", "java/lang/Object"]),
    )
}

/// Third-party `libX:1.0` in the `com.libx` namespace
pub fn lib_x() -> Archive {
    Archive::new()
        .with_entry(
            "com/libx/Foo.class",
            class_file(&["com/libx/Foo", "com/libx/internal/Bar", "Lcom/libx/Foo;", "com.libx.Foo"]),
        )
        .with_entry(
            "com/libx/internal/Bar.class",
            class_file(&["com/libx/internal/Bar", "java/lang/Object"]),
        )
        .with_entry(
            "META-INF/services/com.libx.spi.Provider",
            b"com.libx.internal.ProviderImpl\n".to_vec(),
        )
        .with_entry("com/libx/libx.properties", b"impl=com.libx.internal.Bar\n".to_vec())
        .with_entry("LICENSE.txt", b"libx license".to_vec())
        .with_entry("META-INF/LIBX.SF", b"signature".to_vec())
}
