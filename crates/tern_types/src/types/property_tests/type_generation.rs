use quickcheck::{Arbitrary, Gen};

use crate::store::{TyRef, TypeStore};

/// A test representation of a type that can be transformed unambiguously
/// into a real reference, given a store.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Ty {
    Empty,
    Any,
    Integer,
    IntValue(i8),
    Atom(&'static str),
    Boolean,
    Bits { size: u64, unit: u64 },
    Var(&'static str),
    Tuple(Vec<Ty>),
    Fun(Vec<Ty>, Box<Ty>),
    Map(Box<Ty>, Box<Ty>),
    Record(&'static str, Vec<Ty>),
    List(Box<Ty>),
    Union(Vec<Ty>),
    Intersection(Vec<Ty>),
    Negate(Box<Ty>),
}

const ATOMS: &[&str] = &["ok", "error", "nil", "undefined"];
const TAGS: &[&str] = &["point", "pair"];
const VARS: &[&str] = &["a", "b", "g"];

impl Ty {
    pub(crate) fn into_ref(self, store: &TypeStore) -> TyRef {
        match self {
            Ty::Empty => store.empty(),
            Ty::Any => store.any(),
            Ty::Integer => store.integer(),
            Ty::IntValue(value) => store.int_value(i64::from(value)),
            Ty::Atom(name) => store.atom(name),
            Ty::Boolean => store.boolean(),
            Ty::Bits { size, unit } => store.bitstring(size, unit),
            Ty::Var(name) => store.var_type(store.variable(name)),
            Ty::Tuple(elements) => {
                let elements: Vec<TyRef> =
                    elements.into_iter().map(|ty| ty.into_ref(store)).collect();
                store.tuple(&elements)
            }
            Ty::Fun(domain, codomain) => {
                let domain: Vec<TyRef> = domain.into_iter().map(|ty| ty.into_ref(store)).collect();
                store.function(&domain, codomain.into_ref(store))
            }
            Ty::Map(key, value) => store.map(key.into_ref(store), value.into_ref(store)),
            Ty::Record(tag, fields) => {
                let fields: Vec<TyRef> = fields.into_iter().map(|ty| ty.into_ref(store)).collect();
                store.record(tag, &fields)
            }
            Ty::List(element) => store.list(element.into_ref(store)),
            Ty::Union(members) => members
                .into_iter()
                .fold(store.empty(), |acc, ty| store.union(acc, ty.into_ref(store))),
            Ty::Intersection(members) => members
                .into_iter()
                .fold(store.any(), |acc, ty| store.intersect(acc, ty.into_ref(store))),
            Ty::Negate(inner) => store.negate(inner.into_ref(store)),
        }
    }

    /// Generate an arbitrary type that is not a union, intersection or
    /// other compound.
    fn arbitrary_singular(g: &mut Gen) -> Ty {
        match u32::arbitrary(g) % 8 {
            0 => Ty::Empty,
            1 => Ty::Any,
            2 => Ty::Integer,
            3 => Ty::IntValue(i8::arbitrary(g)),
            4 => Ty::Atom(*g.choose(ATOMS).unwrap()),
            5 => Ty::Boolean,
            // Exact sizes range over all of `u64` to exercise the widened
            // arithmetic; runs (`unit > 0`) stay near the origin so their
            // coverage scans remain cheap to decide exactly.
            6 => {
                if bool::arbitrary(g) {
                    Ty::Bits {
                        size: u64::arbitrary(g),
                        unit: 0,
                    }
                } else {
                    Ty::Bits {
                        size: u64::from(u8::arbitrary(g) % 64),
                        unit: u64::from(u8::arbitrary(g) % 64),
                    }
                }
            }
            7 => Ty::Var(*g.choose(VARS).unwrap()),
            _ => unreachable!(),
        }
    }

    /// Generate an arbitrary type recursively. The `size` parameter
    /// controls the depth of the type tree: `int` has size 0,
    /// `(int ∨ 'ok')` size 1, `((int ∨ 'ok'), bits)` size 2, and so on.
    fn arbitrary_sized(g: &mut Gen, size: u32) -> Ty {
        if size == 0 {
            return Self::arbitrary_singular(g);
        }
        let smaller = |g: &mut Gen, n: usize| -> Vec<Ty> {
            (0..n).map(|_| Self::arbitrary_sized(g, size - 1)).collect()
        };
        match u32::arbitrary(g) % 8 {
            0 => Self::arbitrary_singular(g),
            1 => {
                let n = usize::from(*g.choose(&[0u8, 1, 2]).unwrap());
                Ty::Tuple(smaller(g, n))
            }
            2 => {
                let n = usize::from(*g.choose(&[1u8, 2]).unwrap());
                Ty::Fun(smaller(g, n), Box::new(Self::arbitrary_sized(g, size - 1)))
            }
            3 => Ty::Map(
                Box::new(Self::arbitrary_sized(g, size - 1)),
                Box::new(Self::arbitrary_sized(g, size - 1)),
            ),
            4 => Ty::Record(*g.choose(TAGS).unwrap(), smaller(g, 2)),
            5 => Ty::List(Box::new(Self::arbitrary_sized(g, size - 1))),
            6 => {
                let n = usize::from(*g.choose(&[2u8, 3]).unwrap());
                Ty::Union(smaller(g, n))
            }
            7 => {
                if bool::arbitrary(g) {
                    Ty::Intersection(smaller(g, 2))
                } else {
                    Ty::Negate(Box::new(Self::arbitrary_sized(g, size - 1)))
                }
            }
            _ => unreachable!(),
        }
    }
}

impl Arbitrary for Ty {
    fn arbitrary(g: &mut Gen) -> Self {
        const MAX_SIZE: u32 = 2;
        Self::arbitrary_sized(g, MAX_SIZE)
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
        match self.clone() {
            Ty::Union(members) | Ty::Intersection(members) | Ty::Tuple(members) => {
                Box::new(members.into_iter())
            }
            Ty::Fun(domain, codomain) => {
                Box::new(domain.into_iter().chain(std::iter::once(*codomain)))
            }
            Ty::Map(key, value) => Box::new([*key, *value].into_iter()),
            Ty::Record(_, fields) => Box::new(fields.into_iter()),
            Ty::Negate(inner) | Ty::List(inner) => Box::new(std::iter::once(*inner)),
            Ty::IntValue(value) => Box::new(value.shrink().map(Ty::IntValue)),
            _ => quickcheck::empty_shrinker(),
        }
    }
}
