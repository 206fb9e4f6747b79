use std::collections::HashMap;
use std::sync::Mutex;

/// Compiler-internal texture surface flags, carried next to the native
/// game bits and written to the sidecar when present.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct TexFlags(u16);

bitflags::bitflags! {
    impl TexFlags: u16 {
        /// Face is dropped from leaf mark-surfaces.
        const SKIP      = 0x0001;
        /// Face steers the partitioner, never rendered.
        const HINT      = 0x0002;
        /// Plane is excluded from clip-hull expansion.
        const NO_EXPAND = 0x0004;
    }
}

/// Native surface bits plus the extended compiler flags.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SurfFlags {
    pub native: i32,
    pub extended: TexFlags,
}

impl SurfFlags {
    /// The sidecar only exists when some texinfo carries flags the game
    /// format cannot hold.
    pub fn needs_write(&self) -> bool {
        !self.extended.is_empty()
    }
}

/// A texture projection record: two rows of `[s/t vector | offset]`, the
/// miptex it samples, and its surface flags.
#[derive(Clone, Debug)]
pub struct TexInfo {
    pub vecs: [[f64; 4]; 2],
    pub miptex: usize,
    pub flags: SurfFlags,
    pub output_num: Option<usize>,
}

impl TexInfo {
    pub fn new(vecs: [[f64; 4]; 2], miptex: usize, flags: SurfFlags) -> TexInfo {
        TexInfo {
            vecs,
            miptex,
            flags,
            output_num: None,
        }
    }
}

#[derive(PartialEq, Eq, Hash)]
struct TexInfoKey {
    vec_bits: [[u64; 4]; 2],
    miptex: usize,
    flags: SurfFlags,
}

fn key_of(texinfo: &TexInfo) -> TexInfoKey {
    let mut vec_bits = [[0u64; 4]; 2];
    for i in 0..2 {
        for j in 0..4 {
            debug_assert!(texinfo.vecs[i][j].is_finite());
            vec_bits[i][j] = texinfo.vecs[i][j].to_bits();
        }
    }
    TexInfoKey {
        vec_bits,
        miptex: texinfo.miptex,
        flags: texinfo.flags,
    }
}

#[derive(Default)]
struct PoolInner {
    texinfos: Vec<TexInfo>,
    lookup: HashMap<TexInfoKey, usize>,
}

/// Canonicalises texture projection records; immutable after insertion
/// apart from the lazily assigned output numbers.
#[derive(Default)]
pub struct TexInfoPool {
    inner: Mutex<PoolInner>,
}

impl TexInfoPool {
    pub fn new() -> TexInfoPool {
        TexInfoPool::default()
    }

    /// Returns a global texinfo number, reusing an exact match.
    pub fn find_or_insert(&self, texinfo: TexInfo) -> usize {
        let mut inner = self.inner.lock().unwrap();
        let key = key_of(&texinfo);
        if let Some(&i) = inner.lookup.get(&key) {
            return i;
        }
        let i = inner.texinfos.len();
        inner.texinfos.push(TexInfo {
            output_num: None,
            ..texinfo
        });
        inner.lookup.insert(key, i);
        i
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().texinfos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, texinfo: usize) -> TexInfo {
        self.inner.lock().unwrap().texinfos[texinfo].clone()
    }

    /// Lazy output numbering: assign via `alloc` on first use.
    pub fn assign_output(&self, texinfo: usize, alloc: impl FnOnce(&TexInfo) -> usize) -> usize {
        let mut inner = self.inner.lock().unwrap();
        if let Some(n) = inner.texinfos[texinfo].output_num {
            return n;
        }
        let n = alloc(&inner.texinfos[texinfo]);
        inner.texinfos[texinfo].output_num = Some(n);
        n
    }

    /// Flag records of every exported texinfo, ordered by output index,
    /// or `None` when no record needs the sidecar.
    pub fn exported_extended_flags(&self) -> Option<Vec<SurfFlags>> {
        let inner = self.inner.lock().unwrap();
        if !inner.texinfos.iter().any(|t| t.flags.needs_write()) {
            return None;
        }
        let mut exported: Vec<(usize, SurfFlags)> = inner
            .texinfos
            .iter()
            .filter_map(|t| t.output_num.map(|n| (n, t.flags)))
            .collect();
        exported.sort_by_key(|&(n, _)| n);
        Some(exported.into_iter().map(|(_, f)| f).collect())
    }
}
