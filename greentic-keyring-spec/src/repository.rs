use crate::document::KeyDocument;
use crate::error::Result;
use std::sync::Arc;

/// Durable keyring storage as seen by a key-management host.
///
/// Both operations block the caller until the underlying exchange completes.
pub trait XmlRepository: Send + Sync {
    /// Every key document currently stored; order is unspecified.
    fn get_all_elements(&self) -> Result<Vec<KeyDocument>>;

    /// Persist one key document, optionally under a caller-chosen name.
    fn store_element(&self, element: &KeyDocument, friendly_name: Option<&str>) -> Result<()>;
}

impl<T> XmlRepository for Arc<T>
where
    T: XmlRepository + ?Sized,
{
    fn get_all_elements(&self) -> Result<Vec<KeyDocument>> {
        (**self).get_all_elements()
    }

    fn store_element(&self, element: &KeyDocument, friendly_name: Option<&str>) -> Result<()> {
        (**self).store_element(element, friendly_name)
    }
}

impl<T> XmlRepository for Box<T>
where
    T: XmlRepository + ?Sized,
{
    fn get_all_elements(&self) -> Result<Vec<KeyDocument>> {
        (**self).get_all_elements()
    }

    fn store_element(&self, element: &KeyDocument, friendly_name: Option<&str>) -> Result<()> {
        (**self).store_element(element, friendly_name)
    }
}
