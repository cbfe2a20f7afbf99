//! The image module finds which container in a task definition a newly built image belongs to.
//!
//! An image reference has the form `repository[:tag]`; the repository is everything before the
//! last colon.  A container is updated when its current image is tagged and its repository is
//! the same as the new image's repository.  Only the first such container, in task-definition
//! order, is updated.

use aws_sdk_ecs::types::ContainerDefinition;
use log::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ImageReference<'a> {
    repository: &'a str,
    tag: Option<&'a str>,
}

impl<'a> ImageReference<'a> {
    pub(crate) fn parse(image: &'a str) -> Self {
        match image.rsplit_once(':') {
            Some((repository, tag)) => Self {
                repository,
                tag: Some(tag),
            },
            None => Self {
                repository: image,
                tag: None,
            },
        }
    }

    /// Everything before the last colon, or the whole reference if there is no colon.
    pub(crate) fn repository(&self) -> &'a str {
        self.repository
    }

    pub(crate) fn tag(&self) -> Option<&'a str> {
        self.tag
    }

    pub(crate) fn is_tagged(&self) -> bool {
        self.tag().is_some()
    }

    /// Whether an image currently running as `self` should be replaced by `new`.
    fn is_replaced_by(&self, new: &ImageReference<'_>) -> bool {
        self.is_tagged() && new.is_tagged() && self.repository() == new.repository()
    }
}

/// Replaces the image of the first container matching `new_image` and returns its index.
///
/// The other containers are left untouched, including later ones from the same repository.
///
/// An untagged `new_image` is rejected up front and replaces nothing.  The repository rule alone
/// would let `repo/image` replace `repo/image:v1`; this guard keeps untagged images unmatchable
/// until the intended behavior for them is settled.
pub(crate) fn substitute_image(
    containers: &mut [ContainerDefinition],
    new_image: &str,
) -> Option<usize> {
    let new = ImageReference::parse(new_image);
    if !new.is_tagged() {
        warn!(
            "New image '{}' has no tag, no container image will be replaced",
            new_image
        );
        return None;
    }

    let index = containers.iter().position(|container| {
        container
            .image
            .as_deref()
            .map(ImageReference::parse)
            .map_or(false, |current| current.is_replaced_by(&new))
    })?;

    let container = &mut containers[index];
    debug!(
        "Replacing image '{}' of container {} with '{}'",
        container.image.as_deref().unwrap_or_default(),
        index,
        new_image
    );
    container.image = Some(new_image.to_string());
    Some(index)
}

#[cfg(test)]
mod test {
    use super::*;

    fn container(name: &str, image: &str) -> ContainerDefinition {
        ContainerDefinition::builder()
            .name(name)
            .image(image)
            .memory(512)
            .essential(true)
            .build()
    }

    fn images(containers: &[ContainerDefinition]) -> Vec<&str> {
        containers
            .iter()
            .map(|c| c.image.as_deref().unwrap_or_default())
            .collect()
    }

    #[test]
    fn parse_tagged() {
        let image = ImageReference::parse("repo/image:v1");
        assert_eq!(image.repository(), "repo/image");
        assert_eq!(image.tag(), Some("v1"));
    }

    #[test]
    fn parse_untagged() {
        let image = ImageReference::parse("repo/image");
        assert_eq!(image.repository(), "repo/image");
        assert_eq!(image.tag(), None);
    }

    #[test]
    fn parse_splits_on_last_colon() {
        let image = ImageReference::parse("registry.local:5000/app:1.2");
        assert_eq!(image.repository(), "registry.local:5000/app");
        assert_eq!(image.tag(), Some("1.2"));

        // A registry port with no tag is read as a tag.
        let image = ImageReference::parse("registry.local:5000/app");
        assert_eq!(image.repository(), "registry.local");
        assert_eq!(image.tag(), Some("5000/app"));
    }

    #[test]
    fn replaces_matching_container() {
        let mut containers = vec![
            container("app", "123.dkr/app:v1"),
            container("sidecar", "123.dkr/sidecar:v2"),
        ];
        let original = containers.clone();

        assert_eq!(substitute_image(&mut containers, "123.dkr/app:v2"), Some(0));
        assert_eq!(images(&containers), vec!["123.dkr/app:v2", "123.dkr/sidecar:v2"]);
        assert_eq!(containers[1], original[1]);
        // Only the image changes on the updated container.
        let mut expected = original[0].clone();
        expected.image = Some("123.dkr/app:v2".to_string());
        assert_eq!(containers[0], expected);
    }

    #[test]
    fn first_match_wins() {
        let mut containers = vec![
            container("sidecar", "123.dkr/sidecar:v2"),
            container("app", "123.dkr/app:v1"),
            container("app-canary", "123.dkr/app:v0"),
        ];

        assert_eq!(substitute_image(&mut containers, "123.dkr/app:v2"), Some(1));
        assert_eq!(
            images(&containers),
            vec!["123.dkr/sidecar:v2", "123.dkr/app:v2", "123.dkr/app:v0"]
        );
    }

    #[test]
    fn no_match_leaves_containers_unchanged() {
        let mut containers = vec![
            container("app", "123.dkr/app:v1"),
            container("sidecar", "123.dkr/sidecar:v2"),
        ];
        let original = containers.clone();

        assert_eq!(substitute_image(&mut containers, "123.dkr/other:v9"), None);
        assert_eq!(containers, original);
    }

    #[test]
    fn untagged_container_never_matches() {
        let mut containers = vec![container("app", "123.dkr/app")];
        let original = containers.clone();

        assert_eq!(substitute_image(&mut containers, "123.dkr/app:v2"), None);
        assert_eq!(containers, original);
    }

    #[test]
    fn untagged_new_image_never_matches() {
        let mut containers = vec![
            container("app", "repo/image:v1"),
            container("bare", "repo/image"),
        ];
        let original = containers.clone();

        assert_eq!(substitute_image(&mut containers, "repo/image"), None);
        assert_eq!(containers, original);
    }

    #[test]
    fn container_without_image_is_skipped() {
        let mut containers = vec![
            ContainerDefinition::builder().name("init").build(),
            container("app", "123.dkr/app:v1"),
        ];

        assert_eq!(substitute_image(&mut containers, "123.dkr/app:v2"), Some(1));
        assert_eq!(containers[0].image, None);
    }

    #[test]
    fn empty_container_list() {
        let mut containers: Vec<ContainerDefinition> = Vec::new();
        assert_eq!(substitute_image(&mut containers, "123.dkr/app:v2"), None);
    }

    #[test]
    fn new_image_is_used_verbatim() {
        let mut containers = vec![container("app", "123.dkr/app:v1")];
        assert_eq!(substitute_image(&mut containers, "123.dkr/app:v2\n"), Some(0));
        assert_eq!(images(&containers), vec!["123.dkr/app:v2\n"]);
    }
}
