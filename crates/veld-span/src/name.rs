/// Interned identifier text.
///
/// Names are deduplicated for the lifetime of the database, so comparing two
/// of them is an id comparison.
#[salsa::interned(debug)]
pub struct Name<'db> {
    #[returns(deref)]
    pub text: Box<str>,
}

pub trait IntoName<'db> {
    fn into_name(self, db: &'db dyn salsa::Database) -> Name<'db>;
}

impl<'db, T> IntoName<'db> for T
where
    T: salsa::plumbing::interned::Lookup<Box<str>> + std::hash::Hash,
    Box<str>: salsa::plumbing::interned::HashEqLike<T>,
{
    fn into_name(self, db: &'db dyn salsa::Database) -> Name<'db> {
        Name::new(db, self)
    }
}
